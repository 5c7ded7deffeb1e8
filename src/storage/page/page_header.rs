//! Page header and type definitions.
//!
//! Every page on either backing store starts with a [`PageHeader`]:
//! - [`PageType`] discriminator
//! - CRC32 checksum for integrity

/// Type of page stored on disk.
///
/// Uses `#[repr(u8)]` to guarantee a 1-byte representation for serialization.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    /// Uninitialized or corrupted page.
    #[default]
    Invalid = 0,
    /// Record heap page.
    Data = 1,
    /// Live B-tree node, leaf or internal.
    BTreeNode = 2,
    /// Node page threaded onto the index free list.
    Free = 3,
}

impl PageType {
    /// Convert from u8, returning Invalid for unknown values.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => PageType::Data,
            2 => PageType::BTreeNode,
            3 => PageType::Free,
            _ => PageType::Invalid,
        }
    }
}

/// Metadata stored at the beginning of every page.
///
/// # Layout (5 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       1     page_type (PageType as u8)
/// 1       4     checksum (CRC32, little-endian)
/// ```
///
/// The checksum covers the entire page with the checksum field itself
/// read as zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    /// Type of this page.
    pub page_type: PageType,
    /// CRC32 checksum of the page contents.
    pub checksum: u32,
}

impl PageHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 5;

    pub const OFFSET_PAGE_TYPE: usize = 0;
    pub const OFFSET_CHECKSUM: usize = 1;

    /// Create a new header with the given page type and a zero checksum.
    pub fn new(page_type: PageType) -> Self {
        Self {
            page_type,
            checksum: 0,
        }
    }

    /// Read a header from the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        let mut checksum = [0u8; 4];
        checksum.copy_from_slice(&data[Self::OFFSET_CHECKSUM..Self::OFFSET_CHECKSUM + 4]);

        Self {
            page_type: PageType::from_u8(data[Self::OFFSET_PAGE_TYPE]),
            checksum: u32::from_le_bytes(checksum),
        }
    }

    /// Write this header to the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        data[Self::OFFSET_PAGE_TYPE] = self.page_type as u8;
        data[Self::OFFSET_CHECKSUM..Self::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&self.checksum.to_le_bytes());
    }

    /// Compute the CRC32 of a page, feeding zeros in place of the
    /// checksum field so the checksum never covers itself.
    pub fn compute_checksum(page_data: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&page_data[..Self::OFFSET_CHECKSUM]);
        hasher.update(&[0u8; 4]);
        hasher.update(&page_data[Self::OFFSET_CHECKSUM + 4..]);
        hasher.finalize()
    }

    /// Check the stored checksum against the page contents.
    pub fn verify_checksum(&self, page_data: &[u8]) -> bool {
        self.checksum == Self::compute_checksum(page_data)
    }
}

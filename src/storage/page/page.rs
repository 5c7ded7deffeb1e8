//! Page - the raw byte image of one on-disk page.
//!
//! A [`Page`] is what travels between a [`DiskManager`] and a buffer pool.
//! Its size is fixed per backing store (node pages and data pages differ),
//! so the buffer is heap-allocated at the store's page size.
//!
//! [`DiskManager`]: crate::storage::DiskManager

use super::page_header::{PageHeader, PageType};

/// Raw page image: a [`PageHeader`] followed by a type-specific payload.
///
/// # Example
/// ```
/// use paged_btree::storage::page::{Page, PageType};
///
/// let mut page = Page::new(64);
/// page.payload_mut()[0] = 0xFF;
/// page.seal(PageType::Data);
/// assert!(page.verify_checksum());
/// ```
pub struct Page {
    data: Box<[u8]>,
}

impl Page {
    /// Create a new zeroed page of `size` bytes.
    ///
    /// # Panics
    /// Panics if `size` cannot hold a header.
    pub fn new(size: usize) -> Self {
        assert!(size >= PageHeader::SIZE, "page smaller than its header");
        Self {
            data: vec![0u8; size].into_boxed_slice(),
        }
    }

    /// Get immutable slice of page data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable slice of page data.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Bytes after the header.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.data[PageHeader::SIZE..]
    }

    #[inline]
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.data[PageHeader::SIZE..]
    }

    /// Total size in bytes, header included.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Read the page header.
    pub fn header(&self) -> PageHeader {
        PageHeader::from_bytes(&self.data)
    }

    /// Stamp the page type and a fresh checksum.
    ///
    /// Call this after the payload is final.
    pub fn seal(&mut self, page_type: PageType) {
        PageHeader::new(page_type).write_to(&mut self.data);
        let checksum = PageHeader::compute_checksum(&self.data);
        self.data[PageHeader::OFFSET_CHECKSUM..PageHeader::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&checksum.to_le_bytes());
    }

    /// Verify the page checksum is valid.
    pub fn verify_checksum(&self) -> bool {
        self.header().verify_checksum(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_new_is_zeroed() {
        let page = Page::new(100);
        assert_eq!(page.size(), 100);
        assert_eq!(page.payload().len(), 100 - PageHeader::SIZE);
        assert!(page.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    #[should_panic(expected = "page smaller than its header")]
    fn test_page_too_small() {
        Page::new(PageHeader::SIZE - 1);
    }

    #[test]
    fn test_seal_and_verify() {
        let mut page = Page::new(32);
        page.payload_mut()[3] = 0x7E;
        page.seal(PageType::BTreeNode);

        assert_eq!(page.header().page_type, PageType::BTreeNode);
        assert!(page.verify_checksum());

        page.payload_mut()[3] = 0x7F;
        assert!(!page.verify_checksum());
    }

    #[test]
    fn test_zeroed_page_fails_verification() {
        // A freshly allocated on-disk page has never been sealed.
        let page = Page::new(32);
        assert!(!page.verify_checksum());
    }
}

//! Page identifier type.

use std::fmt;

/// Identifies a page inside one backing store.
///
/// The index file and the data file number their pages independently;
/// page N of a store lives at byte offset `N × page_size`.
///
/// # Example
/// ```
/// use paged_btree::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_valid());
/// assert_eq!(page_id.byte_offset(128), 42 * 128);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Invalid/sentinel page ID.
    ///
    /// Stands for "no page": a missing child of a leaf, the parent of the
    /// root, the end of the free list, or the root of an empty tree.
    pub const INVALID: PageId = PageId(u32::MAX);

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Check if this page ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// File offset of this page for the given page size.
    #[inline]
    pub fn byte_offset(&self, page_size: usize) -> u64 {
        (self.0 as u64) * (page_size as u64)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Page(INVALID)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}

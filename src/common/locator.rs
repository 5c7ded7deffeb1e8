//! Record locator - a key plus the physical address of its record.

use std::fmt;

use crate::common::{Key, PageId, EMPTY_KEY};

/// Where a record lives in the data heap.
///
/// Locators are what tree nodes store. A locator whose key is
/// [`EMPTY_KEY`] marks an unused node slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locator {
    pub key: Key,
    /// Data page holding the record.
    pub page_id: PageId,
    /// Slot of the record inside that page.
    pub slot: u32,
}

impl Locator {
    /// Unused node slot.
    pub const EMPTY: Locator = Locator {
        key: EMPTY_KEY,
        page_id: PageId::INVALID,
        slot: u32::MAX,
    };

    /// Bytes one locator occupies in a node page.
    pub const ENCODED_SIZE: usize = 12;

    pub fn new(key: Key, page_id: PageId, slot: u32) -> Self {
        Self { key, page_id, slot }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.key == EMPTY_KEY
    }
}

impl Default for Locator {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}[{}]", self.key, self.page_id, self.slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_locator() {
        assert!(Locator::EMPTY.is_empty());
        assert!(Locator::default().is_empty());
        assert!(!Locator::new(0, PageId::new(0), 0).is_empty());
    }

    #[test]
    fn test_locator_display() {
        let loc = Locator::new(17, PageId::new(2), 3);
        assert_eq!(format!("{}", loc), "17 -> Page(2)[3]");
    }
}

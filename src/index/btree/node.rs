//! B-tree node page.
//!
//! # Payload layout
//! ```text
//! Offset   Size            Field
//! ------   ----            -----
//! 0        4               parent page id (INVALID = root)
//! 4        4               key count
//! 8        4               next free page (only meaningful on free pages)
//! 12       12 × (2d + 1)   locator slots (key, data page id, slot)
//! ...      4 × (2d + 2)    child page ids (INVALID = none)
//! ```
//!
//! Both arrays carry one slot of slack so a node can hold the extra entry
//! of an overflow until it is rebalanced.

use crate::common::{Error, Key, Locator, PageId, Result};
use crate::storage::page::{ByteReader, ByteWriter, PageHeader, PageType, StoredPage};

/// Shape of every node in one index file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeFormat {
    pub degree: usize,
}

impl NodeFormat {
    #[inline]
    fn locator_slots(&self) -> usize {
        2 * self.degree + 1
    }

    #[inline]
    fn child_slots(&self) -> usize {
        2 * self.degree + 2
    }
}

/// One index page: a tree node, or a page parked on the free list.
///
/// Locators `0..key_count` are sorted by key. An internal node has
/// `key_count + 1` children; a leaf has none, which is recorded as an
/// invalid first child.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    degree: usize,
    parent: PageId,
    key_count: usize,
    next_free: PageId,
    free: bool,
    locators: Vec<Locator>,
    children: Vec<PageId>,
}

impl Node {
    /// An empty leaf.
    pub fn new(degree: usize, parent: PageId) -> Self {
        let format = NodeFormat { degree };
        Self {
            degree,
            parent,
            key_count: 0,
            next_free: PageId::INVALID,
            free: false,
            locators: vec![Locator::EMPTY; format.locator_slots()],
            children: vec![PageId::INVALID; format.child_slots()],
        }
    }

    // ========================================================================
    // Shape
    // ========================================================================

    #[inline]
    pub fn key_count(&self) -> usize {
        self.key_count
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        !self.children[0].is_valid()
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        !self.parent.is_valid()
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.free
    }

    #[inline]
    pub fn parent(&self) -> PageId {
        self.parent
    }

    pub fn set_parent(&mut self, parent: PageId) {
        self.parent = parent;
    }

    #[inline]
    pub fn next_free(&self) -> PageId {
        self.next_free
    }

    pub fn max_keys(&self) -> usize {
        2 * self.degree
    }

    pub fn min_keys(&self) -> usize {
        self.degree
    }

    /// Holds the slack entry and must be rebalanced.
    pub fn is_overflown(&self) -> bool {
        self.key_count > self.max_keys()
    }

    /// Below the minimum. Never true for the root.
    pub fn is_underflown(&self) -> bool {
        !self.is_root() && self.key_count < self.min_keys()
    }

    /// Can take one more key without overflowing.
    pub fn has_free_slots(&self) -> bool {
        self.key_count < self.max_keys()
    }

    /// Can give a key away without underflowing.
    pub fn has_surplus(&self) -> bool {
        self.key_count > self.min_keys()
    }

    // ========================================================================
    // Entries
    // ========================================================================

    /// The occupied locator prefix.
    pub fn locators(&self) -> &[Locator] {
        &self.locators[..self.key_count]
    }

    /// Child ids of an internal node; empty for a leaf.
    pub fn children(&self) -> &[PageId] {
        if self.is_leaf() {
            &[]
        } else {
            &self.children[..=self.key_count]
        }
    }

    pub fn locator_at(&self, pos: usize) -> Locator {
        self.locators()[pos]
    }

    pub fn child_at(&self, pos: usize) -> PageId {
        self.children()[pos]
    }

    pub fn set_locator(&mut self, pos: usize, locator: Locator) {
        debug_assert!(pos < self.key_count);
        self.locators[pos] = locator;
    }

    pub fn first_child(&self) -> PageId {
        self.children[0]
    }

    pub fn last_child(&self) -> PageId {
        self.children[self.key_count]
    }

    /// Position of `key` among this node's locators.
    pub fn bisection_search(&self, key: Key) -> Option<usize> {
        self.locators().binary_search_by_key(&key, |l| l.key).ok()
    }

    /// The child whose range covers `key`: the one right after the last
    /// local key below it.
    pub fn child_for(&self, key: Key) -> PageId {
        let pos = self.locators().partition_point(|l| l.key < key);
        self.children[pos]
    }

    /// Position of `child` in this node's child list.
    pub fn position_of_child(&self, child: PageId) -> Option<usize> {
        self.children().iter().position(|&c| c == child)
    }

    /// Insert a locator in key order, with `right_child` placed directly
    /// after it when the node is internal. Returns the locator's position.
    ///
    /// May use the slack slot; the caller rebalances an overflown node.
    pub fn insert_entry(&mut self, locator: Locator, right_child: Option<PageId>) -> usize {
        debug_assert!(self.key_count < self.locators.len());
        let pos = self.locators().partition_point(|l| l.key < locator.key);

        self.locators.copy_within(pos..self.key_count, pos + 1);
        self.locators[pos] = locator;
        if let Some(child) = right_child {
            self.children
                .copy_within(pos + 1..self.key_count + 1, pos + 2);
            self.children[pos + 1] = child;
        }
        self.key_count += 1;
        pos
    }

    /// Remove the locator at `pos`, plus the child right after it when the
    /// node is internal. Returns both.
    pub fn remove_entry(&mut self, pos: usize) -> (Locator, Option<PageId>) {
        debug_assert!(pos < self.key_count);
        let locator = self.locators[pos];
        let internal = !self.is_leaf();

        self.locators.copy_within(pos + 1..self.key_count, pos);
        self.locators[self.key_count - 1] = Locator::EMPTY;

        let child = if internal {
            let child = self.children[pos + 1];
            self.children
                .copy_within(pos + 2..self.key_count + 1, pos + 1);
            self.children[self.key_count] = PageId::INVALID;
            Some(child)
        } else {
            None
        };

        self.key_count -= 1;
        (locator, child)
    }

    /// Replace every entry. `children` is empty for a leaf, otherwise one
    /// longer than `locators`.
    pub fn set_entries(&mut self, locators: &[Locator], children: &[PageId]) {
        debug_assert!(locators.len() <= self.locators.len());
        debug_assert!(children.is_empty() || children.len() == locators.len() + 1);

        self.locators.fill(Locator::EMPTY);
        self.children.fill(PageId::INVALID);
        self.locators[..locators.len()].copy_from_slice(locators);
        self.children[..children.len()].copy_from_slice(children);
        self.key_count = locators.len();
    }

    /// Turn this page into a free-list entry pointing at `next_free`.
    pub fn make_free(&mut self, next_free: PageId) {
        self.set_entries(&[], &[]);
        self.parent = PageId::INVALID;
        self.next_free = next_free;
        self.free = true;
    }
}

impl StoredPage for Node {
    type Format = NodeFormat;

    fn page_size(format: NodeFormat) -> usize {
        PageHeader::SIZE
            + 12
            + format.locator_slots() * Locator::ENCODED_SIZE
            + format.child_slots() * 4
    }

    fn page_type(&self) -> PageType {
        if self.free {
            PageType::Free
        } else {
            PageType::BTreeNode
        }
    }

    fn decode(format: NodeFormat, page_type: PageType, payload: &[u8]) -> Result<Self> {
        let free = match page_type {
            PageType::BTreeNode => false,
            PageType::Free => true,
            other => {
                return Err(Error::inconsistent(format!(
                    "expected an index page, found {:?}",
                    other
                )))
            }
        };

        let mut r = ByteReader::new(payload);
        let parent = PageId::new(r.get_u32()?);
        let key_count = r.get_u32()? as usize;
        let next_free = PageId::new(r.get_u32()?);
        if key_count > format.locator_slots() {
            return Err(Error::inconsistent(format!(
                "node claims {} keys, at most {} fit",
                key_count,
                format.locator_slots()
            )));
        }

        let mut locators = Vec::with_capacity(format.locator_slots());
        for _ in 0..format.locator_slots() {
            let key = r.get_u32()?;
            let page_id = PageId::new(r.get_u32()?);
            let slot = r.get_u32()?;
            locators.push(Locator::new(key, page_id, slot));
        }
        let mut children = Vec::with_capacity(format.child_slots());
        for _ in 0..format.child_slots() {
            children.push(PageId::new(r.get_u32()?));
        }

        Ok(Self {
            degree: format.degree,
            parent,
            key_count,
            next_free,
            free,
            locators,
            children,
        })
    }

    fn encode(&self, format: NodeFormat, payload: &mut [u8]) {
        debug_assert_eq!(self.degree, format.degree);
        let mut w = ByteWriter::new(payload);
        w.put_u32(self.parent.0);
        w.put_u32(self.key_count as u32);
        w.put_u32(self.next_free.0);
        for loc in &self.locators {
            w.put_u32(loc.key);
            w.put_u32(loc.page_id.0);
            w.put_u32(loc.slot);
        }
        for child in &self.children {
            w.put_u32(child.0);
        }
    }
}

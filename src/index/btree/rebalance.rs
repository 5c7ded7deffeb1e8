//! Overflow and underflow resolution.
//!
//! Both directions prefer compensation with an immediate sibling (left
//! first, then right) and fall back to split or merge. Every routine keeps
//! at most three index pages pinned: a parent and two siblings, or a node,
//! its new right half and a new root. Children that change owner are
//! re-parented after those guards are released, one page at a time.
//!
//! Functions that can change the root return it as `Some(new_root)`;
//! `Some(PageId::INVALID)` means the tree became empty.

use log::debug;

use super::node::Node;
use super::store::NodeStore;
use crate::common::{Error, Key, Locator, PageId, Result};

// ============================================================================
// Insert side
// ============================================================================

/// Rebalance an overflown node by compensation or split.
pub(super) fn resolve_overflow(store: &NodeStore, page_id: PageId) -> Result<Option<PageId>> {
    let parent_id = store.read(page_id)?.parent();
    if !parent_id.is_valid() {
        return split(store, page_id);
    }

    if let Some(left_pos) = pick_sibling(store, parent_id, page_id, Node::has_free_slots)? {
        compensate(store, parent_id, left_pos)?;
        return Ok(None);
    }
    split(store, page_id)
}

/// Move the upper half of an overflown node into a new right sibling and
/// push the median up, growing a new root if needed.
fn split(store: &NodeStore, page_id: PageId) -> Result<Option<PageId>> {
    let (median, right_id, parent_id, moved, new_root) = {
        let mut node = store.write(page_id)?;
        let locators = node.locators().to_vec();
        let children = node.children().to_vec();
        let med = locators.len() / 2;
        let median = locators[med];
        let parent_id = node.parent();

        let mut right = store.allocate(parent_id)?;
        let right_id = right.page_id();
        if children.is_empty() {
            node.set_entries(&locators[..med], &[]);
            right.set_entries(&locators[med + 1..], &[]);
        } else {
            node.set_entries(&locators[..med], &children[..=med]);
            right.set_entries(&locators[med + 1..], &children[med + 1..]);
        }
        let moved = children.get(med + 1..).map(<[PageId]>::to_vec).unwrap_or_default();

        let new_root = if node.is_root() {
            let mut root = store.allocate(PageId::INVALID)?;
            root.set_entries(&[median], &[page_id, right_id]);
            node.set_parent(root.page_id());
            right.set_parent(root.page_id());
            Some(root.page_id())
        } else {
            None
        };
        (median, right_id, parent_id, moved, new_root)
    };

    for child in moved {
        store.set_parent(child, right_id)?;
    }

    if let Some(root) = new_root {
        debug!(
            "split root {} at key {}: new right {}, new root {}",
            page_id, median.key, right_id, root
        );
        return Ok(new_root);
    }
    debug!("split {} at key {}: new right {}", page_id, median.key, right_id);

    let parent_overflown = {
        let mut parent = store.write(parent_id)?;
        parent.insert_entry(median, Some(right_id));
        parent.is_overflown()
    };
    if parent_overflown {
        return resolve_overflow(store, parent_id);
    }
    Ok(None)
}

// ============================================================================
// Delete side
// ============================================================================

/// Remove the locator at `pos` of node `page_id`, then repair any
/// underflow. Internal keys are replaced by their predecessor or successor,
/// which is removed from its leaf instead.
pub(super) fn remove_at(store: &NodeStore, page_id: PageId, pos: usize) -> Result<Option<PageId>> {
    let leaf_id = if store.read(page_id)?.is_leaf() {
        store.write(page_id)?.remove_entry(pos);
        page_id
    } else {
        take_replacement(store, page_id, pos)?
    };

    let (is_root, key_count, underflown) = {
        let leaf = store.read(leaf_id)?;
        (leaf.is_root(), leaf.key_count(), leaf.is_underflown())
    };

    if is_root && key_count == 0 {
        store.free(store.write(leaf_id)?);
        debug!("last key removed, root {} freed", leaf_id);
        return Ok(Some(PageId::INVALID));
    }
    if underflown {
        return resolve_underflow(store, leaf_id);
    }
    Ok(None)
}

/// Overwrite internal locator `pos` with a neighbouring leaf key and remove
/// that key from its leaf. Returns the leaf.
///
/// The predecessor is preferred unless its leaf is at the minimum while
/// the successor's leaf is not.
fn take_replacement(store: &NodeStore, page_id: PageId, pos: usize) -> Result<PageId> {
    let (left_child, right_child) = {
        let node = store.read(page_id)?;
        (node.child_at(pos), node.child_at(pos + 1))
    };
    let pred_leaf = edge_leaf(store, left_child, Edge::Rightmost)?;
    let succ_leaf = edge_leaf(store, right_child, Edge::Leftmost)?;

    let pred_spare = store.read(pred_leaf)?.has_surplus();
    let succ_spare = store.read(succ_leaf)?.has_surplus();

    let (leaf_id, replacement) = if !pred_spare && succ_spare {
        (succ_leaf, store.write(succ_leaf)?.remove_entry(0).0)
    } else {
        let mut leaf = store.write(pred_leaf)?;
        let last = leaf.key_count() - 1;
        (pred_leaf, leaf.remove_entry(last).0)
    };

    store.write(page_id)?.set_locator(pos, replacement);
    debug!(
        "internal key in {} replaced by {} from leaf {}",
        page_id, replacement.key, leaf_id
    );
    Ok(leaf_id)
}

/// Rebalance an underflown non-root node by compensation or merge.
fn resolve_underflow(store: &NodeStore, page_id: PageId) -> Result<Option<PageId>> {
    let parent_id = store.read(page_id)?.parent();

    if let Some(left_pos) = pick_sibling(store, parent_id, page_id, Node::has_surplus)? {
        compensate(store, parent_id, left_pos)?;
        return Ok(None);
    }

    let pos = position_in_parent(store, parent_id, page_id)?;
    merge(store, parent_id, pos.saturating_sub(1))
}

/// Absorb the separator and the right child of the pair at `left_pos` into
/// the left child, freeing the right one.
fn merge(store: &NodeStore, parent_id: PageId, left_pos: usize) -> Result<Option<PageId>> {
    let (left_id, moved, parent_underflown, new_root) = {
        let mut parent = store.write(parent_id)?;
        let left_id = parent.child_at(left_pos);
        let right_id = parent.child_at(left_pos + 1);
        let mut left = store.write(left_id)?;
        let right = store.write(right_id)?;

        let mut locators = left.locators().to_vec();
        locators.push(parent.locator_at(left_pos));
        locators.extend_from_slice(right.locators());
        let mut children = left.children().to_vec();
        let moved = right.children().to_vec();
        children.extend_from_slice(&moved);

        left.set_entries(&locators, &children);
        parent.remove_entry(left_pos);
        store.free(right);
        debug!("merged {} into {} under {}", right_id, left_id, parent_id);

        if parent.is_root() && parent.key_count() == 0 {
            left.set_parent(PageId::INVALID);
            store.free(parent);
            debug!("root {} emptied, {} is the new root", parent_id, left_id);
            (left_id, moved, false, Some(left_id))
        } else {
            (left_id, moved, parent.is_underflown(), None)
        }
    };

    for child in moved {
        store.set_parent(child, left_id)?;
    }

    if parent_underflown {
        return resolve_underflow(store, parent_id);
    }
    Ok(new_root)
}

// ============================================================================
// Shared
// ============================================================================

/// Redistribute the pair of children at `left_pos` and `left_pos + 1`
/// together with their separator: lower half left, median up, upper half
/// right. The parent's key count does not change.
fn compensate(store: &NodeStore, parent_id: PageId, left_pos: usize) -> Result<()> {
    let moved: Vec<(PageId, PageId)> = {
        let mut parent = store.write(parent_id)?;
        let left_id = parent.child_at(left_pos);
        let right_id = parent.child_at(left_pos + 1);
        let mut left = store.write(left_id)?;
        let mut right = store.write(right_id)?;

        let mut locators = left.locators().to_vec();
        locators.push(parent.locator_at(left_pos));
        locators.extend_from_slice(right.locators());
        let left_children = left.children().len();
        let mut children = left.children().to_vec();
        children.extend_from_slice(right.children());

        let med = locators.len() / 2;
        parent.set_locator(left_pos, locators[med]);
        debug!(
            "compensating {} ({} keys) and {} ({} keys), new separator {}",
            left_id,
            left.key_count(),
            right_id,
            right.key_count(),
            locators[med].key
        );

        if children.is_empty() {
            left.set_entries(&locators[..med], &[]);
            right.set_entries(&locators[med + 1..], &[]);
            Vec::new()
        } else {
            left.set_entries(&locators[..med], &children[..=med]);
            right.set_entries(&locators[med + 1..], &children[med + 1..]);
            let keep = med + 1;
            if keep > left_children {
                children[left_children..keep]
                    .iter()
                    .map(|&c| (c, left_id))
                    .collect()
            } else {
                children[keep..left_children]
                    .iter()
                    .map(|&c| (c, right_id))
                    .collect()
            }
        }
    };

    for (child, parent) in moved {
        store.set_parent(child, parent)?;
    }
    Ok(())
}

/// Left position of a sibling pair for compensation: the left sibling if
/// it qualifies, else the right one.
///
/// Left and right come from child positions in the parent. Siblings never
/// overlap in key range, so this orders the pair the same way as comparing
/// their smallest keys, and it still works on a node emptied by underflow.
fn pick_sibling(
    store: &NodeStore,
    parent_id: PageId,
    page_id: PageId,
    qualifies: impl Fn(&Node) -> bool,
) -> Result<Option<usize>> {
    let parent = store.read(parent_id)?;
    let pos = parent
        .position_of_child(page_id)
        .ok_or_else(|| not_a_child(page_id, parent_id))?;

    if pos > 0 && qualifies(&*store.read(parent.child_at(pos - 1))?) {
        return Ok(Some(pos - 1));
    }
    if pos < parent.key_count() && qualifies(&*store.read(parent.child_at(pos + 1))?) {
        return Ok(Some(pos));
    }
    Ok(None)
}

fn position_in_parent(store: &NodeStore, parent_id: PageId, page_id: PageId) -> Result<usize> {
    store
        .read(parent_id)?
        .position_of_child(page_id)
        .ok_or_else(|| not_a_child(page_id, parent_id))
}

fn not_a_child(page_id: PageId, parent_id: PageId) -> Error {
    Error::inconsistent(format!(
        "{} names {} as parent but is not among its children",
        page_id, parent_id
    ))
}

#[derive(Clone, Copy)]
enum Edge {
    Leftmost,
    Rightmost,
}

/// Walk down one edge of a subtree to its leaf.
fn edge_leaf(store: &NodeStore, mut page_id: PageId, edge: Edge) -> Result<PageId> {
    loop {
        let node = store.read(page_id)?;
        if node.is_leaf() {
            return Ok(page_id);
        }
        page_id = match edge {
            Edge::Leftmost => node.first_child(),
            Edge::Rightmost => node.last_child(),
        };
    }
}

/// Root-to-leaf search for `key`: the holding node and position, or the
/// leaf it would be inserted into.
pub(super) fn descend(store: &NodeStore, root: PageId, key: Key) -> Result<Descent> {
    let mut page_id = root;
    loop {
        let node = store.read(page_id)?;
        if let Some(pos) = node.bisection_search(key) {
            return Ok(Descent::Found {
                page_id,
                pos,
                locator: node.locator_at(pos),
            });
        }
        if node.is_leaf() {
            return Ok(Descent::Absent { leaf: page_id });
        }
        page_id = node.child_for(key);
    }
}

/// Result of [`descend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Descent {
    Found {
        page_id: PageId,
        pos: usize,
        locator: Locator,
    },
    Absent {
        leaf: PageId,
    },
}

//! Structural checks over a whole tree.

use std::fmt;

use super::store::NodeStore;
use crate::common::{Error, Key, Locator, PageId, Result};

/// Summary of a tree that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeShape {
    /// Levels from root to leaves, 0 for an empty tree.
    pub height: usize,
    /// Live index pages.
    pub nodes: usize,
    pub keys: usize,
}

impl fmt::Display for TreeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "height: {}, nodes: {}, keys: {}",
            self.height, self.nodes, self.keys
        )
    }
}

/// Walk the subtree under `root` and check every node:
/// - no free page is reachable
/// - keys strictly ascending, also across levels
/// - key count within bounds (the root only needs one key)
/// - internal nodes have one more child than keys
/// - every child names its parent correctly
/// - all leaves at the same depth
///
/// Returns the shape and every locator in key order.
pub(super) fn check_tree(store: &NodeStore, root: PageId) -> Result<(TreeShape, Vec<Locator>)> {
    let mut walk = Walk {
        store,
        leaf_depth: None,
        nodes: 0,
        locators: Vec::new(),
    };
    if root.is_valid() {
        walk.visit(root, PageId::INVALID, 1, None, None)?;
    }

    let shape = TreeShape {
        height: walk.leaf_depth.unwrap_or(0),
        nodes: walk.nodes,
        keys: walk.locators.len(),
    };
    Ok((shape, walk.locators))
}

struct Walk<'a> {
    store: &'a NodeStore,
    leaf_depth: Option<usize>,
    nodes: usize,
    locators: Vec<Locator>,
}

impl Walk<'_> {
    fn visit(
        &mut self,
        page_id: PageId,
        expected_parent: PageId,
        depth: usize,
        lower: Option<Key>,
        upper: Option<Key>,
    ) -> Result<()> {
        let (locators, children, parent, is_leaf, min, max) = {
            let node = self.store.read(page_id)?;
            if node.is_free() {
                return Err(violation(page_id, "reachable page is on the free list"));
            }
            (
                node.locators().to_vec(),
                node.children().to_vec(),
                node.parent(),
                node.is_leaf(),
                node.min_keys(),
                node.max_keys(),
            )
        };
        self.nodes += 1;

        if parent != expected_parent {
            return Err(violation(
                page_id,
                &format!("parent is {}, expected {}", parent, expected_parent),
            ));
        }

        let count = locators.len();
        let is_root = !expected_parent.is_valid();
        let min = if is_root { 1 } else { min };
        if count < min || count > max {
            return Err(violation(
                page_id,
                &format!("{} keys, allowed {}..={}", count, min, max),
            ));
        }

        let mut prev = lower;
        for loc in &locators {
            if loc.is_empty() {
                return Err(violation(page_id, "empty locator inside the key range"));
            }
            if prev.is_some_and(|p| loc.key <= p) {
                return Err(violation(page_id, &format!("key {} out of order", loc.key)));
            }
            prev = Some(loc.key);
        }
        if let (Some(last), Some(upper)) = (prev, upper) {
            if last >= upper {
                return Err(violation(
                    page_id,
                    &format!("key {} not below separator {}", last, upper),
                ));
            }
        }

        if is_leaf {
            match self.leaf_depth {
                None => self.leaf_depth = Some(depth),
                Some(d) if d != depth => {
                    return Err(violation(
                        page_id,
                        &format!("leaf at depth {}, others at {}", depth, d),
                    ))
                }
                Some(_) => {}
            }
            self.locators.extend_from_slice(&locators);
            return Ok(());
        }

        if children.len() != count + 1 || children.iter().any(|c| !c.is_valid()) {
            return Err(violation(
                page_id,
                &format!("{} keys but children {:?}", count, children),
            ));
        }

        for (i, &child) in children.iter().enumerate() {
            let lo = if i == 0 { lower } else { Some(locators[i - 1].key) };
            let hi = if i == count { upper } else { Some(locators[i].key) };
            self.visit(child, page_id, depth + 1, lo, hi)?;
            if i < count {
                self.locators.push(locators[i]);
            }
        }
        Ok(())
    }
}

fn violation(page_id: PageId, what: &str) -> Error {
    Error::inconsistent(format!("{}: {}", page_id, what))
}

//! B-tree index over the record heap.
//!
//! # Components
//! - [`Node`] - One index page: sorted locators, child ids, parent link
//! - [`NodeStore`] - Index buffer pool plus the free list of index pages
//! - `rebalance` - Compensation, split and merge
//! - [`BTree`] - The tree handle
//! - [`TreeShape`] - Result of structural validation
//!
//! A node of degree `d` holds `d..=2d` keys (the root `1..=2d`). Overflow
//! and underflow are first resolved by redistributing with a sibling and
//! only then by splitting or merging, so pages fill up before the tree
//! grows.

mod node;
mod rebalance;
mod store;
mod tree;
mod validate;

pub use node::{Node, NodeFormat};
pub use store::NodeStore;
pub use tree::{BTree, IoStats};
pub use validate::TreeShape;

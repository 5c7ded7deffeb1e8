//! Buffer pool management.
//!
//! The buffer pool is the only gateway between the engine and its backing
//! stores. The index and the record heap each own one pool.
//!
//! # Components
//! - [`BufferPoolManager`] - The page cache, generic over the page type
//! - [`Frame`] - A slot in the pool holding a decoded page + metadata
//! - [`PageReadGuard`] / [`PageWriteGuard`] - RAII guards for page access
//! - [`BufferPoolStats`] - Hit/miss and disk access counters
//! - [`replacer`] - Eviction policy

mod buffer_pool_manager;
mod frame;
mod page_guard;
pub mod replacer;
mod stats;

pub use buffer_pool_manager::BufferPoolManager;
pub use frame::{Frame, FrameId};
pub use page_guard::{PageReadGuard, PageWriteGuard};
pub use stats::{BufferPoolStats, StatsSnapshot};

//! paged-btree - a disk-backed B-tree index over fixed-size record pages.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          paged-btree                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Tree handle (index::btree)                  │   │
//! │  │   insert / read / update / remove, re-rooting            │   │
//! │  │   compensation → split (overflow), → merge (underflow)   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │               ↓ locators                 ↓ node pages           │
//! │  ┌──────────────────────────┐  ┌─────────────────────────┐     │
//! │  │   Record heap (heap/)    │  │  NodeStore + free list  │     │
//! │  │ slots, free-slot pages   │  │  of index pages         │     │
//! │  └──────────────────────────┘  └─────────────────────────┘     │
//! │               ↓                          ↓                      │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │   Buffer pools (buffer/) - "data" and "index"            │   │
//! │  │   pinned frames, RAII guards, FIFO write-back eviction   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │   DiskManager per file + Page + PageHeader (CRC32)       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, Key, Locator, Error, config)
//! - [`storage`] - Disk I/O and page formats
//! - [`buffer`] - Buffer pool management
//! - [`heap`] - Records and data pages
//! - [`index`] - The B-tree
//! - [`logging`] - `env_logger` setup
//!
//! # Quick Start
//! ```no_run
//! use paged_btree::{BTree, TreeConfig};
//!
//! let config = TreeConfig::default().with_degree(2);
//! let mut tree = BTree::create(config, "index.dat", "data.dat")?;
//! for key in 1..=9 {
//!     tree.insert(key, [key as f64, 1.0, 1.0, 1.0, 1.0])?;
//! }
//! assert_eq!(tree.height()?, 2);
//! tree.flush()?;
//! # Ok::<(), paged_btree::Error>(())
//! ```

pub mod buffer;
pub mod common;
pub mod heap;
pub mod index;
pub mod logging;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::{Error, Key, Locator, PageId, Result, TreeConfig};

pub use buffer::{BufferPoolManager, BufferPoolStats, StatsSnapshot};
pub use heap::{write_data_file, Attributes, Record, RecordHeap};
pub use index::btree::{BTree, IoStats, TreeShape};
pub use storage::page::{Page, PageHeader, PageType};
pub use storage::DiskManager;

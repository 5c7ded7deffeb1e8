//! Storage layer - disk I/O and page formats.
//!
//! This module handles the two backing stores:
//! - [`DiskManager`] - Low-level file I/O over fixed-size pages
//! - [`page`] - Raw page images, headers and typed page encoding

mod disk_manager;
pub mod page;

pub use disk_manager::DiskManager;

//! Common types and utilities shared across paged-btree.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and [`TreeConfig`]
//! - Error types
//! - Identifiers ([`PageId`], [`Key`]) and the record [`Locator`]

pub mod config;
pub mod error;
mod locator;
mod page_id;

pub use config::TreeConfig;
pub use error::{Error, Result};
pub use locator::Locator;
pub use page_id::PageId;

/// Record key. `u32::MAX` is reserved as the empty-slot sentinel.
pub type Key = u32;

/// Key value marking an empty locator slot.
pub const EMPTY_KEY: Key = u32::MAX;

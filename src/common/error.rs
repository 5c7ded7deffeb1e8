//! Error types for paged-btree.

use thiserror::Error;

use crate::common::{Key, PageId};

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors raised by the index, the record heap and the
/// storage layers underneath them.
///
/// Every error is detected synchronously at the point of violation and
/// handed to the caller. Nothing is retried and nothing is repaired.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from a backing-store read or write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Insert of a key that is already indexed. Nothing was mutated.
    #[error("key {0} already exists")]
    DuplicateKey(Key),

    /// Read, update or remove of a key the tree does not hold.
    #[error("key {0} not found")]
    KeyNotFound(Key),

    /// The key collides with the empty-slot sentinel.
    #[error("key {0} is reserved for empty slots")]
    InvalidKey(Key),

    /// An attribute is not a positive, finite real number.
    #[error("attribute {index} must be a positive real number, got {value}")]
    InvalidAttribute { index: usize, value: f64 },

    /// The stored structures disagree with each other: a locator naming a
    /// free slot, a slot outside its page, a bad checksum, a child that does
    /// not know its parent.
    #[error("inconsistent state: {0}")]
    InconsistentState(String),

    /// Every frame of a pool is pinned and nothing can be evicted.
    ///
    /// This indicates a pin leak or a pool configured smaller than the
    /// working set of a single operation.
    #[error("{pool} buffer pool exhausted: all {capacity} frames are pinned")]
    BufferExhausted { pool: &'static str, capacity: usize },

    /// Requested page lies beyond the end of its file.
    #[error("{0} not found")]
    PageNotFound(PageId),

    /// A page was requested while a conflicting guard on it is still alive.
    #[error("{0} is already latched by a live guard")]
    PageLatched(PageId),

    /// The configuration cannot run a tree.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub(crate) fn inconsistent(msg: impl Into<String>) -> Self {
        Error::InconsistentState(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PageNotFound(PageId::new(42));
        assert_eq!(format!("{}", err), "Page(42) not found");

        let err = Error::BufferExhausted {
            pool: "index",
            capacity: 3,
        };
        assert_eq!(
            format!("{}", err),
            "index buffer pool exhausted: all 3 frames are pinned"
        );

        let err = Error::InvalidAttribute {
            index: 0,
            value: -1.0,
        };
        assert_eq!(
            format!("{}", err),
            "attribute 0 must be a positive real number, got -1"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_inconsistent_helper() {
        let err = Error::inconsistent("slot 3 is free");
        assert_eq!(format!("{}", err), "inconsistent state: slot 3 is free");
    }
}

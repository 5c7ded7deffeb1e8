//! Eviction policy implementations (replacers).
//!
//! - [`FifoReplacer`] - oldest unpinned frame goes first

mod fifo;

pub use fifo::FifoReplacer;

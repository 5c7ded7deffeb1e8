//! Buffer pool statistics tracking.
//!
//! The disk read/write counters are what the diagnostics layer reports per
//! operation: take a [`snapshot`](BufferPoolStats::snapshot) before, another
//! after, and diff them with [`StatsSnapshot::since`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters maintained by one buffer pool.
///
/// Atomic so the pool can update them through `&self`; `Relaxed` ordering
/// is enough because no counter synchronises with another.
#[derive(Debug, Default)]
pub struct BufferPoolStats {
    /// Fetches served from a resident frame.
    pub cache_hits: AtomicU64,

    /// Fetches that had to go to disk.
    pub cache_misses: AtomicU64,

    /// Frames reclaimed from a resident page.
    pub evictions: AtomicU64,

    /// Pages read from the backing store.
    pub disk_reads: AtomicU64,

    /// Pages written to the backing store.
    pub disk_writes: AtomicU64,
}

impl BufferPoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a plain copy of the current counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            disk_reads: self.disk_reads.load(Ordering::Relaxed),
            disk_writes: self.disk_writes.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.disk_reads.store(0, Ordering::Relaxed);
        self.disk_writes.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time copy of buffer pool statistics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub evictions: u64,
    pub disk_reads: u64,
    pub disk_writes: u64,
}

impl StatsSnapshot {
    /// Cache hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    /// Activity between `earlier` and `self`.
    pub fn since(&self, earlier: &StatsSnapshot) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits.saturating_sub(earlier.cache_hits),
            cache_misses: self.cache_misses.saturating_sub(earlier.cache_misses),
            evictions: self.evictions.saturating_sub(earlier.evictions),
            disk_reads: self.disk_reads.saturating_sub(earlier.disk_reads),
            disk_writes: self.disk_writes.saturating_sub(earlier.disk_writes),
        }
    }

    /// Total backing-store accesses.
    pub fn disk_accesses(&self) -> u64 {
        self.disk_reads + self.disk_writes
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reads: {}, writes: {}, hits: {}, misses: {}, evictions: {}",
            self.disk_reads, self.disk_writes, self.cache_hits, self.cache_misses, self.evictions
        )
    }
}

//! FIFO (First-In-First-Out) replacement policy.
//!
//! Victims are chosen in load order, skipping anything still pinned.

use std::collections::{HashSet, VecDeque};

use crate::buffer::FrameId;

/// A FIFO eviction policy.
///
/// A frame enters the queue when a page is loaded into it and leaves when
/// it is evicted. Re-accessing a resident page does not move it.
pub struct FifoReplacer {
    /// Frame IDs in load order (front = oldest).
    queue: VecDeque<FrameId>,

    /// Membership of `queue`, for O(1) duplicate checks.
    in_queue: HashSet<FrameId>,

    /// Frames whose pin count is zero.
    evictable: HashSet<FrameId>,
}

impl FifoReplacer {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            in_queue: HashSet::new(),
            evictable: HashSet::new(),
        }
    }

    /// Record that a frame was accessed. Only the first access enqueues it.
    pub fn record_access(&mut self, frame_id: FrameId) {
        if self.in_queue.insert(frame_id) {
            self.queue.push_back(frame_id);
        }
    }

    /// Flip a frame's eviction eligibility (pin count reached or left 0).
    pub fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        if evictable {
            self.evictable.insert(frame_id);
        } else {
            self.evictable.remove(&frame_id);
        }
    }

    /// Select a victim frame for eviction.
    ///
    /// Scans from the oldest frame and returns the first unpinned one.
    /// Pinned frames keep their place in the queue. Returns `None` if every
    /// tracked frame is pinned.
    pub fn evict(&mut self) -> Option<FrameId> {
        let pos = self
            .queue
            .iter()
            .position(|fid| self.evictable.contains(fid))?;
        let frame_id = self.queue.remove(pos)?;
        self.in_queue.remove(&frame_id);
        self.evictable.remove(&frame_id);
        Some(frame_id)
    }

    /// Number of evictable frames.
    pub fn size(&self) -> usize {
        self.evictable.len()
    }
}

impl Default for FifoReplacer {
    fn default() -> Self {
        Self::new()
    }
}

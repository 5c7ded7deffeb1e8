//! Frame - a slot in a buffer pool.
//!
//! A [`Frame`] holds one decoded page plus the metadata needed for buffer
//! management:
//! - Which page is loaded (if any)
//! - Pin count for reference counting
//! - Dirty flag for write-back tracking

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, Mutex, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};

use crate::common::PageId;

/// Identifies a frame in a buffer pool.
///
/// Frames are stored in a `Vec`, so the id indexes it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub usize);

impl FrameId {
    #[inline]
    pub fn new(id: usize) -> Self {
        FrameId(id)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}

/// A frame in a buffer pool.
///
/// The page slot is `None` while the frame sits on the pool's free list.
/// Locks are taken with `try_*`: the engine is single-threaded, so a
/// contended lock means a second guard on the same page, which is reported
/// to the caller instead of blocking forever.
pub struct Frame<P> {
    /// The decoded page, protected by RwLock.
    page: RwLock<Option<P>>,

    /// Which page is currently loaded, or None if frame is empty.
    page_id: Mutex<Option<PageId>>,

    /// Number of live guards on this frame.
    pin_count: AtomicU32,

    /// Whether the page has been modified since it was loaded or written.
    is_dirty: AtomicBool,
}

impl<P> Frame<P> {
    /// Create a new empty frame.
    pub fn new() -> Self {
        Self {
            page: RwLock::new(None),
            page_id: Mutex::new(None),
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
        }
    }

    // ========================================================================
    // Page access
    // ========================================================================

    /// Shared access to the loaded page.
    ///
    /// Returns `None` if the frame is empty or a write guard is alive.
    pub fn try_read(&self) -> Option<MappedRwLockReadGuard<'_, P>> {
        let lock = self.page.try_read()?;
        RwLockReadGuard::try_map(lock, |slot| slot.as_ref()).ok()
    }

    /// Exclusive access to the loaded page.
    ///
    /// Returns `None` if the frame is empty or any other guard is alive.
    pub fn try_write(&self) -> Option<MappedRwLockWriteGuard<'_, P>> {
        let lock = self.page.try_write()?;
        RwLockWriteGuard::try_map(lock, |slot| slot.as_mut()).ok()
    }

    /// Load `page` as `page_id` into this frame. Pin and dirty state reset.
    pub fn install(&self, page_id: PageId, page: P) {
        *self.page.write() = Some(page);
        self.set_page_id(Some(page_id));
        self.pin_count.store(0, Ordering::Relaxed);
        self.is_dirty.store(false, Ordering::Relaxed);
    }

    /// Empty the frame, handing back whatever page it held.
    pub fn take(&self) -> Option<P> {
        self.set_page_id(None);
        self.is_dirty.store(false, Ordering::Relaxed);
        self.page.write().take()
    }

    // ========================================================================
    // Page ID management
    // ========================================================================

    #[inline]
    pub fn page_id(&self) -> Option<PageId> {
        *self.page_id.lock()
    }

    #[inline]
    pub fn set_page_id(&self, page_id: Option<PageId>) {
        *self.page_id.lock() = page_id;
    }

    // ========================================================================
    // Pin count operations
    // ========================================================================

    /// Increment the pin count. Returns the new pin count.
    #[inline]
    pub fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Decrement the pin count. Returns the new pin count.
    ///
    /// # Panics
    /// Panics if pin count is already 0.
    #[inline]
    pub fn unpin(&self) -> u32 {
        let old = self.pin_count.fetch_sub(1, Ordering::Relaxed);
        assert!(old > 0, "pin count underflow");
        old - 1
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    // ========================================================================
    // Dirty flag operations
    // ========================================================================

    #[inline]
    pub fn mark_dirty(&self) {
        self.is_dirty.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn clear_dirty(&self) {
        self.is_dirty.store(false, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Relaxed)
    }

    // ========================================================================
    // Frame state queries
    // ========================================================================

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.page_id().is_none()
    }

    #[inline]
    pub fn is_evictable(&self) -> bool {
        self.page_id().is_some() && !self.is_pinned()
    }
}

impl<P> Default for Frame<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_new() {
        let frame: Frame<u64> = Frame::new();
        assert!(frame.is_empty());
        assert!(!frame.is_pinned());
        assert!(!frame.is_dirty());
        assert!(frame.try_read().is_none());
    }

    #[test]
    fn test_frame_install_and_take() {
        let frame = Frame::new();
        frame.install(PageId::new(7), 99u64);

        assert_eq!(frame.page_id(), Some(PageId::new(7)));
        assert_eq!(*frame.try_read().unwrap(), 99);
        assert!(frame.is_evictable());

        frame.mark_dirty();
        assert_eq!(frame.take(), Some(99));
        assert!(frame.is_empty());
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_frame_pin_unpin() {
        let frame: Frame<u64> = Frame::new();

        assert_eq!(frame.pin(), 1);
        assert_eq!(frame.pin(), 2);
        assert_eq!(frame.unpin(), 1);
        assert!(frame.is_pinned());
        assert_eq!(frame.unpin(), 0);
        assert!(!frame.is_pinned());
    }

    #[test]
    #[should_panic(expected = "pin count underflow")]
    fn test_frame_unpin_underflow() {
        let frame: Frame<u64> = Frame::new();
        frame.unpin();
    }

    #[test]
    fn test_frame_latching() {
        let frame = Frame::new();
        frame.install(PageId::new(1), String::from("node"));

        {
            let r1 = frame.try_read().unwrap();
            let r2 = frame.try_read().unwrap();
            assert_eq!(*r1, *r2);
            assert!(frame.try_write().is_none());
        }

        {
            let mut w = frame.try_write().unwrap();
            w.push('!');
            assert!(frame.try_read().is_none());
            assert!(frame.try_write().is_none());
        }

        assert_eq!(*frame.try_read().unwrap(), "node!");
    }

    #[test]
    fn test_frame_evictable() {
        let frame = Frame::new();
        assert!(!frame.is_evictable());

        frame.install(PageId::new(1), 0u8);
        assert!(frame.is_evictable());

        frame.pin();
        assert!(!frame.is_evictable());

        frame.unpin();
        assert!(frame.is_evictable());
    }
}

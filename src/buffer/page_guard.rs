//! RAII guards for page access.
//!
//! These guards are the only way to reach a buffered page:
//! - [`PageReadGuard`] - Shared read access (multiple allowed)
//! - [`PageWriteGuard`] - Exclusive write access (auto-marks dirty)
//!
//! Both guards unpin the page when dropped, so every exit path of a caller,
//! early `?` returns included, gives its pins back.

use std::ops::{Deref, DerefMut};

use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard};

use super::buffer_pool_manager::BufferPoolManager;
use super::frame::FrameId;
use crate::common::PageId;
use crate::storage::page::StoredPage;

/// Guard for read-only page access.
///
/// # Example
/// ```ignore
/// let node = pool.fetch_page_read(page_id)?;
/// let n = node.key_count();  // Deref to &P
/// // guard drops here, page unpinned
/// ```
pub struct PageReadGuard<'a, P: StoredPage> {
    /// Reference back to the pool for unpin on drop.
    bpm: &'a BufferPoolManager<P>,
    frame_id: FrameId,
    page_id: PageId,
    lock: MappedRwLockReadGuard<'a, P>,
}

impl<'a, P: StoredPage> PageReadGuard<'a, P> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager<P>,
        frame_id: FrameId,
        page_id: PageId,
        lock: MappedRwLockReadGuard<'a, P>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            lock,
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }
}

impl<P: StoredPage> Deref for PageReadGuard<'_, P> {
    type Target = P;

    #[inline]
    fn deref(&self) -> &P {
        &self.lock
    }
}

impl<P: StoredPage> Drop for PageReadGuard<'_, P> {
    fn drop(&mut self) {
        self.bpm.unpin_page_internal(self.frame_id, false);
    }
}

/// Guard for exclusive write access to a page.
///
/// The page is marked dirty and unpinned when the guard is dropped.
///
/// # Example
/// ```ignore
/// let mut node = pool.fetch_page_write(page_id)?;
/// node.set_parent(new_parent);  // DerefMut to &mut P
/// // guard drops here, page marked dirty and unpinned
/// ```
pub struct PageWriteGuard<'a, P: StoredPage> {
    bpm: &'a BufferPoolManager<P>,
    frame_id: FrameId,
    page_id: PageId,
    lock: MappedRwLockWriteGuard<'a, P>,
}

impl<'a, P: StoredPage> PageWriteGuard<'a, P> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager<P>,
        frame_id: FrameId,
        page_id: PageId,
        lock: MappedRwLockWriteGuard<'a, P>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            lock,
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }
}

impl<P: StoredPage> Deref for PageWriteGuard<'_, P> {
    type Target = P;

    #[inline]
    fn deref(&self) -> &P {
        &self.lock
    }
}

impl<P: StoredPage> DerefMut for PageWriteGuard<'_, P> {
    #[inline]
    fn deref_mut(&mut self) -> &mut P {
        &mut self.lock
    }
}

impl<P: StoredPage> Drop for PageWriteGuard<'_, P> {
    fn drop(&mut self) {
        self.bpm.unpin_page_internal(self.frame_id, true);
    }
}

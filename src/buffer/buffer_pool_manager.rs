//! Buffer Pool Manager - the page caching layer.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between disk and memory, decoded into typed pages
//! - Pin-based reference counting through RAII guards
//! - Dirty page write-back on eviction and on explicit flush
//! - FIFO eviction of unpinned pages

use std::collections::HashMap;

use log::trace;
use parking_lot::{Mutex, RwLock};

use crate::buffer::replacer::FifoReplacer;
use crate::buffer::{BufferPoolStats, Frame, FrameId, PageReadGuard, PageWriteGuard};
use crate::common::{Error, PageId, Result};
use crate::storage::page::{Page, StoredPage};
use crate::storage::DiskManager;

/// Bounded cache of typed pages over one backing store.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                  BufferPoolManager<P>                       │
/// │  ┌──────────────┐  ┌───────────────────────────────────┐   │
/// │  │ page_table   │  │       frames: Vec<Frame<P>>       │   │
/// │  │PageId → Fid  │─▶│  [Frame0] [Frame1] [Frame2] ...   │   │
/// │  └──────────────┘  └───────────────────────────────────┘   │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
/// │  │  free_list   │  │   replacer   │  │disk_manager  │      │
/// │  │ Vec<FrameId> │  │ FifoReplacer │  │   Mutex      │      │
/// │  └──────────────┘  └──────────────┘  └──────────────┘      │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// Every method takes `&self`, so an operation can hold guards on several
/// pages of the same pool at once (a node, its parent and a sibling).
/// The engine is single-threaded; the locks give interior mutability and
/// turn a double latch on one page into [`Error::PageLatched`].
///
/// A fetch on a full pool evicts the oldest unpinned page, writing it back
/// first if dirty. If every frame is pinned the fetch fails with
/// [`Error::BufferExhausted`].
pub struct BufferPoolManager<P: StoredPage> {
    /// Pool name used in logs and errors ("index", "data").
    name: &'static str,

    /// Fixed pool of frames allocated at startup.
    frames: Vec<Frame<P>>,

    /// Maps page IDs to frame IDs.
    page_table: RwLock<HashMap<PageId, FrameId>>,

    /// Stack of empty frame IDs.
    free_list: Mutex<Vec<FrameId>>,

    /// Eviction policy for selecting victim frames.
    replacer: Mutex<FifoReplacer>,

    /// Handles all disk I/O.
    disk_manager: Mutex<DiskManager>,

    /// Shape shared by every page of this store.
    format: P::Format,

    stats: BufferPoolStats,

    /// Number of frames in the pool (immutable after construction).
    pool_size: usize,
}

impl<P: StoredPage> BufferPoolManager<P> {
    /// Create a pool of `pool_size` frames over `disk_manager`.
    ///
    /// # Errors
    /// `InvalidConfig` if the pool is empty or the store's page size does
    /// not match the encoded size of `P` under `format`.
    pub fn new(
        name: &'static str,
        pool_size: usize,
        disk_manager: DiskManager,
        format: P::Format,
    ) -> Result<Self> {
        if pool_size == 0 {
            return Err(Error::InvalidConfig(format!(
                "{} pool must have at least one frame",
                name
            )));
        }
        let expected = P::page_size(format);
        if disk_manager.page_size() != expected {
            return Err(Error::InvalidConfig(format!(
                "{} store uses {}-byte pages, {:?} needs {}",
                name,
                disk_manager.page_size(),
                format,
                expected
            )));
        }

        Ok(Self {
            name,
            frames: (0..pool_size).map(|_| Frame::new()).collect(),
            page_table: RwLock::new(HashMap::new()),
            // Reversed so frame 0 is handed out first.
            free_list: Mutex::new((0..pool_size).rev().map(FrameId::new).collect()),
            replacer: Mutex::new(FifoReplacer::new()),
            disk_manager: Mutex::new(disk_manager),
            format,
            stats: BufferPoolStats::new(),
            pool_size,
        })
    }

    // ========================================================================
    // Public API: Fetch pages
    // ========================================================================

    /// Fetch a page for reading (shared access).
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page doesn't exist on disk
    /// - `Error::BufferExhausted` if all frames are pinned
    /// - `Error::PageLatched` if a write guard on the page is alive
    /// - `Error::InconsistentState` if the stored page fails verification
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_, P>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        match self.frames[frame_id.0].try_read() {
            Some(lock) => Ok(PageReadGuard::new(self, frame_id, page_id, lock)),
            None => {
                self.unpin_page_internal(frame_id, false);
                Err(Error::PageLatched(page_id))
            }
        }
    }

    /// Fetch a page for writing (exclusive access).
    ///
    /// The page is marked dirty when the guard drops.
    ///
    /// # Errors
    /// As [`fetch_page_read`](Self::fetch_page_read); `PageLatched` if any
    /// other guard on the page is alive.
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_, P>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        match self.frames[frame_id.0].try_write() {
            Some(lock) => Ok(PageWriteGuard::new(self, frame_id, page_id, lock)),
            None => {
                self.unpin_page_internal(frame_id, false);
                Err(Error::PageLatched(page_id))
            }
        }
    }

    // ========================================================================
    // Public API: Create pages
    // ========================================================================

    /// Append a new page to the store and load `page` into it.
    ///
    /// Returns a write guard, so the page reaches disk at the latest when
    /// it is evicted or flushed.
    pub fn new_page(&self, page: P) -> Result<PageWriteGuard<'_, P>> {
        let frame_id = self.get_free_frame()?;

        let allocated = self.disk_manager.lock().allocate_page();
        let page_id = match allocated {
            Ok(pid) => pid,
            Err(e) => {
                self.free_list.lock().push(frame_id);
                return Err(e);
            }
        };

        let frame = &self.frames[frame_id.0];
        frame.install(page_id, page);
        frame.pin();
        self.page_table.write().insert(page_id, frame_id);
        {
            let mut replacer = self.replacer.lock();
            replacer.record_access(frame_id);
            replacer.set_evictable(frame_id, false);
        }
        trace!("{} pool: new {} in {}", self.name, page_id, frame_id);

        let lock = frame.try_write().ok_or(Error::PageLatched(page_id))?;
        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    // ========================================================================
    // Public API: Flush pages
    // ========================================================================

    /// Write a resident page back if it is dirty.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let frame_id = match self.page_table.read().get(&page_id) {
            Some(&fid) => fid,
            None => return Ok(()),
        };
        self.flush_frame(frame_id, page_id)
    }

    /// Write back every dirty resident page and sync the store.
    pub fn flush_all_pages(&self) -> Result<()> {
        let pages: Vec<(PageId, FrameId)> = {
            let pt = self.page_table.read();
            pt.iter().map(|(&pid, &fid)| (pid, fid)).collect()
        };

        for (page_id, frame_id) in pages {
            self.flush_frame(frame_id, page_id)?;
        }

        self.disk_manager.lock().sync()
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn free_frame_count(&self) -> usize {
        self.free_list.lock().len()
    }

    /// Number of pages currently resident.
    pub fn resident_pages(&self) -> usize {
        self.page_table.read().len()
    }

    /// Number of pages in the backing store.
    pub fn disk_page_count(&self) -> u32 {
        self.disk_manager.lock().page_count()
    }

    /// Pin count of a resident page, `None` if not resident.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let fid = *self.page_table.read().get(&page_id)?;
        Some(self.frames[fid.0].pin_count())
    }

    /// Number of frames with a live guard.
    pub fn pinned_frames(&self) -> usize {
        self.frames.iter().filter(|f| f.is_pinned()).count()
    }

    // ========================================================================
    // Internal: Called by guards on drop
    // ========================================================================

    pub(crate) fn unpin_page_internal(&self, frame_id: FrameId, is_dirty: bool) {
        let frame = &self.frames[frame_id.0];

        if is_dirty {
            frame.mark_dirty();
        }

        if frame.unpin() == 0 {
            self.replacer.lock().set_evictable(frame_id, true);
        }
    }

    // ========================================================================
    // Internal: Core fetch logic
    // ========================================================================

    /// Bring a page into the pool and pin it, returning its frame.
    fn fetch_page_internal(&self, page_id: PageId) -> Result<FrameId> {
        let resident = self.page_table.read().get(&page_id).copied();
        if let Some(frame_id) = resident {
            self.handle_cache_hit(frame_id);
            return Ok(frame_id);
        }

        self.handle_cache_miss(page_id)
    }

    fn handle_cache_hit(&self, frame_id: FrameId) {
        self.frames[frame_id.0].pin();
        {
            let mut replacer = self.replacer.lock();
            replacer.record_access(frame_id);
            replacer.set_evictable(frame_id, false);
        }
        BufferPoolStats::bump(&self.stats.cache_hits);
    }

    fn handle_cache_miss(&self, page_id: PageId) -> Result<FrameId> {
        BufferPoolStats::bump(&self.stats.cache_misses);

        let frame_id = self.get_free_frame()?;

        let page = match self.load_from_disk(page_id) {
            Ok(page) => page,
            Err(e) => {
                self.free_list.lock().push(frame_id);
                return Err(e);
            }
        };

        let frame = &self.frames[frame_id.0];
        frame.install(page_id, page);
        frame.pin();
        self.page_table.write().insert(page_id, frame_id);
        {
            let mut replacer = self.replacer.lock();
            replacer.record_access(frame_id);
            replacer.set_evictable(frame_id, false);
        }
        trace!("{} pool: loaded {} into {}", self.name, page_id, frame_id);

        Ok(frame_id)
    }

    /// Read, verify and decode one page.
    fn load_from_disk(&self, page_id: PageId) -> Result<P> {
        let raw = self.disk_manager.lock().read_page(page_id)?;
        BufferPoolStats::bump(&self.stats.disk_reads);

        if !raw.verify_checksum() {
            return Err(Error::inconsistent(format!(
                "{} store: checksum mismatch on {}",
                self.name, page_id
            )));
        }
        P::decode(self.format, raw.header().page_type, raw.payload())
    }

    // ========================================================================
    // Internal: Frame allocation and eviction
    // ========================================================================

    fn get_free_frame(&self) -> Result<FrameId> {
        if let Some(frame_id) = self.free_list.lock().pop() {
            return Ok(frame_id);
        }
        self.evict_page()
    }

    fn evict_page(&self) -> Result<FrameId> {
        let frame_id = self
            .replacer
            .lock()
            .evict()
            .ok_or(Error::BufferExhausted {
                pool: self.name,
                capacity: self.pool_size,
            })?;

        let frame = &self.frames[frame_id.0];
        if let Some(old_page_id) = frame.page_id() {
            if let Err(e) = self.flush_frame(frame_id, old_page_id) {
                // Leave the page resident so nothing is lost.
                let mut replacer = self.replacer.lock();
                replacer.record_access(frame_id);
                replacer.set_evictable(frame_id, true);
                return Err(e);
            }
            self.page_table.write().remove(&old_page_id);
            trace!("{} pool: evicted {} from {}", self.name, old_page_id, frame_id);
        }
        frame.take();

        BufferPoolStats::bump(&self.stats.evictions);
        Ok(frame_id)
    }

    /// Encode and write a frame's page if dirty.
    fn flush_frame(&self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        let frame = &self.frames[frame_id.0];
        if !frame.is_dirty() {
            return Ok(());
        }

        let mut raw = Page::new(P::page_size(self.format));
        {
            let page = frame.try_read().ok_or(Error::PageLatched(page_id))?;
            page.encode(self.format, raw.payload_mut());
            raw.seal(page.page_type());
        }
        self.disk_manager.lock().write_page(page_id, &raw)?;

        frame.clear_dirty();
        BufferPoolStats::bump(&self.stats.disk_writes);
        trace!("{} pool: wrote back {}", self.name, page_id);
        Ok(())
    }
}

//! Record heap - slot allocation over data pages.

use std::collections::VecDeque;
use std::path::Path;

use log::debug;

use super::data_page::{DataPage, DataPageFormat};
use super::record::{validate_attributes, Attributes, Record};
use crate::buffer::{BufferPoolManager, BufferPoolStats};
use crate::common::{Error, Locator, PageId, Result};
use crate::storage::page::StoredPage;
use crate::storage::DiskManager;

/// The data heap: a buffer pool over the data file plus the list of pages
/// known to have at least one free slot.
///
/// The heap knows nothing about the index. A [`Locator`] returned by
/// [`allocate`](Self::allocate) is the only way back to a record.
///
/// Data pages are never removed from the file. Freed slots are reused,
/// lowest slot first, on the first page of the free-slot list.
pub struct RecordHeap {
    pool: BufferPoolManager<DataPage>,

    /// Pages with at least one free slot, in the order they became so.
    free_pages: VecDeque<PageId>,

    slots_per_page: usize,
}

impl RecordHeap {
    /// Create an empty heap, truncating `path`.
    pub fn create<P: AsRef<Path>>(path: P, slots_per_page: usize, pool_pages: usize) -> Result<Self> {
        let format = DataPageFormat {
            slots: slots_per_page,
        };
        let dm = DiskManager::create(path, DataPage::page_size(format))?;
        Ok(Self {
            pool: BufferPoolManager::new("data", pool_pages, dm, format)?,
            free_pages: VecDeque::new(),
            slots_per_page,
        })
    }

    /// Open an existing data file and rebuild the free-slot list by
    /// scanning every page.
    pub fn open<P: AsRef<Path>>(path: P, slots_per_page: usize, pool_pages: usize) -> Result<Self> {
        let format = DataPageFormat {
            slots: slots_per_page,
        };
        let dm = DiskManager::open(path, DataPage::page_size(format))?;
        let mut heap = Self {
            pool: BufferPoolManager::new("data", pool_pages, dm, format)?,
            free_pages: VecDeque::new(),
            slots_per_page,
        };

        for page_id in heap.page_ids() {
            let page = heap.pool.fetch_page_read(page_id)?;
            if page.has_free_slot() {
                heap.free_pages.push_back(page_id);
            }
        }
        debug!(
            "data heap opened: {} pages, {} with free slots",
            heap.page_count(),
            heap.free_pages.len()
        );
        Ok(heap)
    }

    // ========================================================================
    // Slot operations
    // ========================================================================

    /// Store a record and return where it went.
    ///
    /// Fills the lowest free slot of the first page on the free-slot list,
    /// or appends a new page when the list is empty.
    pub fn allocate(&mut self, record: Record) -> Result<Locator> {
        record.validate()?;

        if let Some(&page_id) = self.free_pages.front() {
            let mut page = self.pool.fetch_page_write(page_id)?;
            let slot = page.place(record)?;
            if page.is_full() {
                self.free_pages.pop_front();
            }
            return Ok(Locator::new(record.key, page_id, slot as u32));
        }

        let mut page = DataPage::new(self.slots_per_page);
        let slot = page.place(record)?;
        let has_room = page.has_free_slot();
        let guard = self.pool.new_page(page)?;
        let page_id = guard.page_id();
        if has_room {
            self.free_pages.push_back(page_id);
        }
        debug!("data heap: new {}", page_id);
        Ok(Locator::new(record.key, page_id, slot as u32))
    }

    /// Empty the slot a locator names and return the record it held.
    pub fn free(&mut self, locator: &Locator) -> Result<Record> {
        let record = {
            let mut page = self.pool.fetch_page_write(locator.page_id)?;
            check_key(page.record(locator.slot as usize)?, locator)?;
            page.clear(locator.slot as usize)?
        };
        if !self.free_pages.contains(&locator.page_id) {
            self.free_pages.push_back(locator.page_id);
        }
        Ok(record)
    }

    /// Overwrite a record's attributes in place. Nothing changes if any
    /// attribute is invalid.
    pub fn update(&mut self, locator: &Locator, attributes: Attributes) -> Result<()> {
        validate_attributes(&attributes)?;
        let mut page = self.pool.fetch_page_write(locator.page_id)?;
        check_key(page.record(locator.slot as usize)?, locator)?;
        page.set_attributes(locator.slot as usize, attributes)
    }

    pub fn read(&self, locator: &Locator) -> Result<Record> {
        let page = self.pool.fetch_page_read(locator.page_id)?;
        let record = *page.record(locator.slot as usize)?;
        check_key(&record, locator)?;
        Ok(record)
    }

    // ========================================================================
    // Scans and info
    // ========================================================================

    /// Locators of every occupied slot, page by page, slot by slot.
    pub fn scan(&self) -> Result<Vec<Locator>> {
        let mut locators = Vec::new();
        for page_id in self.page_ids() {
            let page = self.pool.fetch_page_read(page_id)?;
            locators.extend(
                page.occupied_slots()
                    .map(|(slot, record)| Locator::new(record.key, page_id, slot as u32)),
            );
        }
        Ok(locators)
    }

    /// Write back dirty data pages and sync the file.
    pub fn flush(&self) -> Result<()> {
        self.pool.flush_all_pages()
    }

    pub fn stats(&self) -> &BufferPoolStats {
        self.pool.stats()
    }

    /// Pages currently on the free-slot list.
    pub fn free_pages(&self) -> Vec<PageId> {
        self.free_pages.iter().copied().collect()
    }

    pub fn page_count(&self) -> u32 {
        self.pool.disk_page_count()
    }

    /// Number of frames with a live guard.
    pub fn pinned_frames(&self) -> usize {
        self.pool.pinned_frames()
    }

    fn page_ids(&self) -> impl Iterator<Item = PageId> {
        (0..self.pool.disk_page_count()).map(PageId::new)
    }
}

/// A locator must name the record it was created for.
fn check_key(record: &Record, locator: &Locator) -> Result<()> {
    if record.key != locator.key {
        return Err(Error::inconsistent(format!(
            "locator {} points at a record with key {}",
            locator, record.key
        )));
    }
    Ok(())
}

//! Disk Manager - low-level file I/O for one backing store.
//!
//! The [`DiskManager`] handles all direct file operations:
//! - Reading and writing pages
//! - Allocating new pages
//! - Managing the store file

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Manages disk I/O for a single flat file of fixed-size pages.
///
/// # File Layout
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0       S        2S     ...      N×S
/// ```
///
/// Page N is located at file offset `N × page_size`. The index store and
/// the data heap each own one `DiskManager` with their own page size.
///
/// # Durability
/// Writes go to the OS page cache; [`sync`](Self::sync) forces them out.
/// There is no write-ahead log and no crash recovery.
pub struct DiskManager {
    file: File,
    page_size: usize,
    /// Number of pages in the file.
    page_count: u32,
}

impl DiskManager {
    /// Create a store file, truncating any previous contents.
    pub fn create<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            file,
            page_size,
            page_count: 0,
        })
    }

    /// Open an existing store file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist, cannot be opened, or its
    /// length is not a whole number of pages.
    pub fn open<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let file_size = file.metadata()?.len();
        if file_size % page_size as u64 != 0 {
            return Err(Error::inconsistent(format!(
                "{} is {} bytes, not a multiple of the {}-byte page size",
                path.as_ref().display(),
                file_size,
                page_size
            )));
        }
        let page_count = (file_size / page_size as u64) as u32;

        Ok(Self {
            file,
            page_size,
            page_count,
        })
    }

    /// Read a page from disk.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page doesn't exist.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        if page_id.0 >= self.page_count {
            return Err(Error::PageNotFound(page_id));
        }

        self.file
            .seek(SeekFrom::Start(page_id.byte_offset(self.page_size)))?;

        let mut page = Page::new(self.page_size);
        self.file.read_exact(page.as_mut_slice())?;

        Ok(page)
    }

    /// Write a page to disk.
    ///
    /// The page must have been previously allocated with `allocate_page()`.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        if page_id.0 >= self.page_count {
            return Err(Error::PageNotFound(page_id));
        }
        debug_assert_eq!(page.size(), self.page_size);

        self.file
            .seek(SeekFrom::Start(page_id.byte_offset(self.page_size)))?;
        self.file.write_all(page.as_slice())?;

        Ok(())
    }

    /// Allocate a new page at the end of the file.
    ///
    /// The file is extended with a zeroed page. A zeroed page carries no
    /// valid checksum, so it must be written before it is ever read back.
    pub fn allocate_page(&mut self) -> Result<PageId> {
        let page_id = PageId::new(self.page_count);

        self.file
            .seek(SeekFrom::Start(page_id.byte_offset(self.page_size)))?;
        self.file.write_all(&vec![0u8; self.page_size])?;

        self.page_count += 1;
        Ok(page_id)
    }

    /// Force written pages down to the device.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Get the number of pages in the store.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Get the total size of the store file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        (self.page_count as u64) * (self.page_size as u64)
    }
}

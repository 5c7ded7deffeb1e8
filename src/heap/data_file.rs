//! Bulk packing of records into a fresh data file.

use std::path::Path;

use log::info;

use super::data_page::{DataPage, DataPageFormat};
use super::record::Record;
use crate::common::{Error, Result};
use crate::storage::page::{Page, StoredPage};
use crate::storage::DiskManager;

/// Write `records` into consecutive data pages at `path`, filling each page
/// before starting the next. The file is truncated first.
///
/// Returns the number of pages written. Keys are not checked for
/// uniqueness here; [`BTree::build_from_data_file`] skips duplicates.
///
/// [`BTree::build_from_data_file`]: crate::index::btree::BTree::build_from_data_file
pub fn write_data_file<P, I>(path: P, records: I, records_per_page: usize) -> Result<u32>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = Record>,
{
    if records_per_page == 0 {
        return Err(Error::InvalidConfig(
            "data pages need at least one slot".to_string(),
        ));
    }

    let format = DataPageFormat {
        slots: records_per_page,
    };
    let mut dm = DiskManager::create(path.as_ref(), DataPage::page_size(format))?;

    let mut page = DataPage::new(records_per_page);
    let mut total = 0usize;
    for record in records {
        record.validate()?;
        page.place(record)?;
        total += 1;
        if page.is_full() {
            write_page(&mut dm, format, &page)?;
            page = DataPage::new(records_per_page);
        }
    }
    if page.occupied() > 0 {
        write_page(&mut dm, format, &page)?;
    }
    dm.sync()?;

    info!(
        "packed {} records into {} data pages at {}",
        total,
        dm.page_count(),
        path.as_ref().display()
    );
    Ok(dm.page_count())
}

fn write_page(dm: &mut DiskManager, format: DataPageFormat, page: &DataPage) -> Result<()> {
    let mut raw = Page::new(DataPage::page_size(format));
    page.encode(format, raw.payload_mut());
    raw.seal(page.page_type());
    let page_id = dm.allocate_page()?;
    dm.write_page(page_id, &raw)
}

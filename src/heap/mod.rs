//! Record heap - the data file the index points into.
//!
//! # Components
//! - [`Record`] - Key plus five positive real attributes
//! - [`DataPage`] - Fixed number of record slots with a free-slot bitmap
//! - [`RecordHeap`] - Slot allocation, free-slot page list, in-place update
//! - [`write_data_file`] - Packs a record sequence into a fresh data file

mod data_file;
mod data_page;
mod record;
mod record_heap;

pub use data_file::write_data_file;
pub use data_page::{DataPage, DataPageFormat};
pub use record::{validate_attributes, validate_key, Attributes, Record};
pub use record_heap::RecordHeap;

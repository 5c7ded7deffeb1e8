//! Page types and layout.
//!
//! This module contains:
//! - [`Page`] - The raw byte image of one on-disk page
//! - [`PageHeader`] - Type tag and checksum at the start of every page
//! - [`PageType`] - Discriminator for different page formats
//! - [`StoredPage`] - How a typed page maps onto a [`Page`]

mod codec;
#[allow(clippy::module_inception)]
mod page;
mod page_header;

pub use codec::{ByteReader, ByteWriter, StoredPage};
pub use page::Page;
pub use page_header::{PageHeader, PageType};

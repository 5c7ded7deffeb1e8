//! Typed page encoding.
//!
//! Buffer pools cache decoded pages, not raw bytes. A [`StoredPage`]
//! describes how one page type maps onto a [`Page`] payload; the small
//! little-endian cursors below do the byte shuffling.
//!
//! [`Page`]: super::Page

use std::fmt;

use super::page_header::PageType;
use crate::common::Result;

/// A page type that lives in a buffer pool and round-trips through disk.
pub trait StoredPage: Sized {
    /// Shape parameters every page of a store shares (node degree,
    /// slots per data page). Needed to size and decode the payload.
    type Format: Copy + fmt::Debug;

    /// On-disk size of one page in bytes, header included.
    fn page_size(format: Self::Format) -> usize;

    /// Type tag written into the page header.
    fn page_type(&self) -> PageType;

    /// Rebuild a page from a checksum-verified payload.
    fn decode(format: Self::Format, page_type: PageType, payload: &[u8]) -> Result<Self>;

    /// Serialize into a zeroed payload of exactly the store's payload size.
    fn encode(&self, format: Self::Format, payload: &mut [u8]);
}

/// Sequential little-endian writer over a payload slice.
pub struct ByteWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> ByteWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn put_u32(&mut self, value: u32) {
        self.put_bytes(&value.to_le_bytes());
    }

    pub fn put_f64(&mut self, value: f64) {
        self.put_bytes(&value.to_le_bytes());
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }
}

/// Sequential little-endian reader over a payload slice.
///
/// Reads past the end yield `InconsistentState` instead of panicking, since
/// the bytes come from disk.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.get_bytes(4)?);
        Ok(u32::from_le_bytes(raw))
    }

    pub fn get_f64(&mut self) -> Result<f64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.get_bytes(8)?);
        Ok(f64::from_le_bytes(raw))
    }

    pub fn get_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos + n;
        if end > self.buf.len() {
            return Err(crate::common::Error::inconsistent(format!(
                "page payload truncated: need {} bytes, have {}",
                end,
                self.buf.len()
            )));
        }
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_reader_layout() {
        let mut buf = [0u8; 20];
        {
            let mut w = ByteWriter::new(&mut buf);
            w.put_u32(0x0A0B0C0D);
            w.put_u32(0);
            w.put_f64(2.5);
        }
        assert_eq!(&buf[..4], &[0x0D, 0x0C, 0x0B, 0x0A]);
        assert_eq!(&buf[4..8], &[0, 0, 0, 0]);

        let mut r = ByteReader::new(&buf);
        assert_eq!(r.get_u32().unwrap(), 0x0A0B0C0D);
        assert_eq!(r.get_u32().unwrap(), 0);
        assert_eq!(r.get_f64().unwrap(), 2.5);
    }

    #[test]
    fn test_reader_rejects_truncated_payload() {
        let buf = [1u8, 2, 3];
        let mut r = ByteReader::new(&buf);
        assert!(r.get_u32().is_err());
    }
}

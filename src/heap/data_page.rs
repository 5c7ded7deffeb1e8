//! Data page - a fixed number of record slots.
//!
//! # Payload layout
//! ```text
//! Offset        Size            Field
//! ------        ----            -----
//! 0             4               occupied slot count
//! 4             ceil(C / 8)     free-slot bitmap (bit set = slot free)
//! 4 + ceil(C/8) C × 44          records (key u32, 5 × f64)
//! ```

use bit_vec::BitVec;

use super::record::{Attributes, Record};
use crate::common::{Error, Result};
use crate::storage::page::{ByteReader, ByteWriter, PageHeader, PageType, StoredPage};

/// Shape of every page in one data heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataPageFormat {
    /// Record slots per page.
    pub slots: usize,
}

impl DataPageFormat {
    fn bitmap_bytes(&self) -> usize {
        self.slots.div_ceil(8)
    }
}

/// A page of the record heap.
///
/// Invariant: `occupied` equals the number of clear bits in `free`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPage {
    free: BitVec,
    records: Vec<Record>,
    occupied: usize,
}

impl DataPage {
    /// An empty page with `slots` free slots.
    pub fn new(slots: usize) -> Self {
        Self {
            free: BitVec::from_elem(slots, true),
            records: vec![Record::vacant(); slots],
            occupied: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.occupied == self.capacity()
    }

    #[inline]
    pub fn has_free_slot(&self) -> bool {
        !self.is_full()
    }

    /// `true` for a free slot or a slot outside the page.
    pub fn is_slot_free(&self, slot: usize) -> bool {
        self.free.get(slot).unwrap_or(true)
    }

    /// Lowest-numbered free slot.
    pub fn first_free_slot(&self) -> Option<usize> {
        self.free.iter().position(|is_free| is_free)
    }

    /// Store `record` in the lowest free slot and return that slot.
    pub fn place(&mut self, record: Record) -> Result<usize> {
        let slot = self
            .first_free_slot()
            .ok_or_else(|| Error::inconsistent("no free slot in a page listed as having one"))?;
        self.put(slot, record)?;
        Ok(slot)
    }

    /// Store `record` in a specific free slot.
    pub fn put(&mut self, slot: usize, record: Record) -> Result<()> {
        self.check_bounds(slot)?;
        if !self.is_slot_free(slot) {
            return Err(Error::inconsistent(format!("slot {} is already occupied", slot)));
        }
        self.records[slot] = record;
        self.free.set(slot, false);
        self.occupied += 1;
        Ok(())
    }

    /// The record in an occupied slot.
    pub fn record(&self, slot: usize) -> Result<&Record> {
        self.check_occupied(slot)?;
        Ok(&self.records[slot])
    }

    /// Overwrite the attributes of an occupied slot. The key stays.
    pub fn set_attributes(&mut self, slot: usize, attributes: Attributes) -> Result<()> {
        self.check_occupied(slot)?;
        self.records[slot].attributes = attributes;
        Ok(())
    }

    /// Empty an occupied slot, returning what it held.
    pub fn clear(&mut self, slot: usize) -> Result<Record> {
        self.check_occupied(slot)?;
        let record = std::mem::replace(&mut self.records[slot], Record::vacant());
        self.free.set(slot, true);
        self.occupied -= 1;
        Ok(record)
    }

    /// Occupied slots in slot order.
    pub fn occupied_slots(&self) -> impl Iterator<Item = (usize, &Record)> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(move |(slot, _)| !self.is_slot_free(*slot))
    }

    fn check_bounds(&self, slot: usize) -> Result<()> {
        if slot >= self.capacity() {
            return Err(Error::inconsistent(format!(
                "slot {} outside a {}-slot page",
                slot,
                self.capacity()
            )));
        }
        Ok(())
    }

    fn check_occupied(&self, slot: usize) -> Result<()> {
        self.check_bounds(slot)?;
        if self.is_slot_free(slot) {
            return Err(Error::inconsistent(format!("slot {} is free", slot)));
        }
        Ok(())
    }
}

impl StoredPage for DataPage {
    type Format = DataPageFormat;

    fn page_size(format: DataPageFormat) -> usize {
        PageHeader::SIZE + 4 + format.bitmap_bytes() + format.slots * Record::ENCODED_SIZE
    }

    fn page_type(&self) -> PageType {
        PageType::Data
    }

    fn decode(format: DataPageFormat, page_type: PageType, payload: &[u8]) -> Result<Self> {
        if page_type != PageType::Data {
            return Err(Error::inconsistent(format!(
                "expected a data page, found {:?}",
                page_type
            )));
        }

        let mut r = ByteReader::new(payload);
        let occupied = r.get_u32()? as usize;
        let mut free = BitVec::from_bytes(r.get_bytes(format.bitmap_bytes())?);
        free.truncate(format.slots);

        let mut records = Vec::with_capacity(format.slots);
        for _ in 0..format.slots {
            records.push(Record::decode(&mut r)?);
        }

        let counted = free.iter().filter(|is_free| !is_free).count();
        if counted != occupied {
            return Err(Error::inconsistent(format!(
                "data page claims {} records but its bitmap marks {}",
                occupied, counted
            )));
        }

        Ok(Self {
            free,
            records,
            occupied,
        })
    }

    fn encode(&self, format: DataPageFormat, payload: &mut [u8]) {
        debug_assert_eq!(self.capacity(), format.slots);
        let mut w = ByteWriter::new(payload);
        w.put_u32(self.occupied as u32);
        w.put_bytes(&self.free.to_bytes());
        for record in &self.records {
            record.encode(&mut w);
        }
    }
}

//! Fixed-shape records stored in the data heap.

use crate::common::config::ATTRIBUTE_COUNT;
use crate::common::{Error, Key, Result, EMPTY_KEY};
use crate::storage::page::{ByteReader, ByteWriter};

/// Record payload: a fixed array of real numbers.
pub type Attributes = [f64; ATTRIBUTE_COUNT];

/// One heap record. The key is its identity and never changes once stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record {
    pub key: Key,
    pub attributes: Attributes,
}

impl Record {
    /// Bytes one record occupies in a data page.
    pub const ENCODED_SIZE: usize = 4 + 8 * ATTRIBUTE_COUNT;

    pub fn new(key: Key, attributes: Attributes) -> Self {
        Self { key, attributes }
    }

    /// Placeholder held by a free slot.
    pub(crate) fn vacant() -> Self {
        Self {
            key: EMPTY_KEY,
            attributes: [0.0; ATTRIBUTE_COUNT],
        }
    }

    /// Check key and attributes before the record is stored.
    pub fn validate(&self) -> Result<()> {
        validate_key(self.key)?;
        validate_attributes(&self.attributes)
    }

    pub(crate) fn encode(&self, w: &mut ByteWriter<'_>) {
        w.put_u32(self.key);
        for value in self.attributes {
            w.put_f64(value);
        }
    }

    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        let key = r.get_u32()?;
        let mut attributes = [0.0; ATTRIBUTE_COUNT];
        for value in attributes.iter_mut() {
            *value = r.get_f64()?;
        }
        Ok(Self { key, attributes })
    }
}

/// Reject the key reserved for empty slots.
pub fn validate_key(key: Key) -> Result<()> {
    if key == EMPTY_KEY {
        return Err(Error::InvalidKey(key));
    }
    Ok(())
}

/// Every attribute must be a positive, finite real number.
pub fn validate_attributes(attributes: &Attributes) -> Result<()> {
    match attributes
        .iter()
        .position(|&v| !(v.is_finite() && v > 0.0))
    {
        Some(index) => Err(Error::InvalidAttribute {
            index,
            value: attributes[index],
        }),
        None => Ok(()),
    }
}

//! Record type for stored values.

use crate::error::Error;
use crate::value::{Attributes, Value};
use rkyv::{Archive, Deserialize, Serialize};

/// One named attribute in its archived form.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct Field {
    /// Attribute name.
    pub name: String,
    /// Attribute value.
    pub value: Value,
}

/// A stored record with metadata.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct Record {
    /// Attributes in name order.
    pub fields: Vec<Field>,

    /// Write timestamp in microseconds since Unix epoch.
    pub written_at: u64,
}

impl Record {
    /// Create a new record with the current timestamp.
    pub fn new(attributes: &Attributes) -> Self {
        Self::with_timestamp(attributes, super::key::current_timestamp())
    }

    /// Create a record with a specific timestamp.
    pub fn with_timestamp(attributes: &Attributes, written_at: u64) -> Self {
        let fields = attributes
            .iter()
            .map(|(name, value)| Field {
                name: name.clone(),
                value: value.clone(),
            })
            .collect();
        Self { fields, written_at }
    }

    /// Rebuild the attribute map.
    pub fn into_attributes(self) -> Attributes {
        self.fields
            .into_iter()
            .map(|field| (field.name, field.value))
            .collect()
    }

    /// Serialize the record to bytes using rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a record from bytes using rkyv.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

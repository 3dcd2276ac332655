//! Record key encoding.

use std::fmt;

use crate::value::RecordId;

/// Size of the encoded record identifier in bytes.
pub const RECORD_ID_SIZE: usize = 8;

/// A key addressing one record of one entity type.
///
/// Key format: `[entity_type bytes][0x00][record_id (8 bytes, big-endian)]`
///
/// Big-endian encoding keeps lexicographic ordering equal to numeric
/// ordering, so a prefix scan returns an entity type's records by ascending
/// identifier.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    /// Entity type name.
    pub entity_type: String,
    /// Record identifier.
    pub id: RecordId,
}

impl RecordKey {
    /// Create a new record key.
    pub fn new(entity_type: impl Into<String>, id: RecordId) -> Self {
        Self {
            entity_type: entity_type.into(),
            id,
        }
    }

    /// Encode the key to bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Self::prefix(&self.entity_type);
        buf.extend_from_slice(&self.id.to_be_bytes());
        buf
    }

    /// Decode a key from bytes.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < RECORD_ID_SIZE + 1 {
            return None;
        }
        let split = bytes.len() - RECORD_ID_SIZE;
        if bytes[split - 1] != 0 {
            return None;
        }
        let entity_type = std::str::from_utf8(&bytes[..split - 1]).ok()?;

        let mut id_bytes = [0u8; RECORD_ID_SIZE];
        id_bytes.copy_from_slice(&bytes[split..]);

        Some(Self {
            entity_type: entity_type.to_string(),
            id: u64::from_be_bytes(id_bytes),
        })
    }

    /// Get the prefix for scanning all records of an entity type.
    pub fn prefix(entity_type: &str) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(entity_type.len() + 1 + RECORD_ID_SIZE);
        prefix.extend_from_slice(entity_type.as_bytes());
        prefix.push(0); // Null separator
        prefix
    }
}

impl fmt::Debug for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.entity_type, self.id)
    }
}

/// Get current timestamp in microseconds since Unix epoch.
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let key = RecordKey::new("Widget", 1234567890);
        let decoded = RecordKey::decode(&key.encode()).unwrap();
        assert_eq!(key, decoded);
    }

    #[test]
    fn test_lexicographic_ordering() {
        let k1 = RecordKey::new("Widget", 9).encode();
        let k2 = RecordKey::new("Widget", 10).encode();
        let k3 = RecordKey::new("Widget", 300).encode();

        assert!(k1 < k2);
        assert!(k2 < k3);
    }

    #[test]
    fn test_prefix_isolates_entity_types() {
        let widget = RecordKey::new("Widget", 1).encode();
        let widgets = RecordKey::new("Widgets", 1).encode();
        assert!(widget.starts_with(&RecordKey::prefix("Widget")));
        assert!(!widgets.starts_with(&RecordKey::prefix("Widget")));
    }

    #[test]
    fn test_decode_invalid() {
        assert!(RecordKey::decode(&[0u8; 4]).is_none());
        let mut bad = RecordKey::new("Widget", 1).encode();
        let sep = bad.len() - RECORD_ID_SIZE - 1;
        bad[sep] = b'x';
        assert!(RecordKey::decode(&bad).is_none());
    }
}

//! Reversible operation log.
//!
//! Every mutating batch appends one [`RollbackEntry`] holding what is needed
//! to undo it. Entries are numbered in execution order and undone newest
//! first.

use std::collections::BTreeMap;

use crate::value::{Attributes, RecordId, Value};

/// Prior values of the attributes an update touched. `None` marks an
/// attribute the record did not have, which undo removes again.
pub type PriorAttributes = BTreeMap<String, Option<Value>>;

/// A row captured because it belonged to a deleted parent.
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedSnapshot {
    /// Entity type of the related row.
    pub entity_type: String,
    /// Identifier of the related row.
    pub id: RecordId,
    /// Full attributes at deletion time.
    pub attributes: Attributes,
}

/// Undo information for one batch.
#[derive(Debug, Clone, PartialEq)]
pub enum RollbackPayload {
    /// Records inserted by a `create` batch.
    Created {
        entity_type: String,
        ids: Vec<RecordId>,
    },
    /// Prior values of the attributes an `update` batch changed.
    Updated {
        entity_type: String,
        changes: Vec<(RecordId, PriorAttributes)>,
    },
    /// Records removed by a `delete` batch, with the related rows removed
    /// alongside them.
    Deleted {
        entity_type: String,
        snapshots: Vec<(RecordId, Attributes)>,
        related: Vec<RelatedSnapshot>,
    },
}

impl RollbackPayload {
    /// Name of the operation that produced the entry.
    pub fn operation(&self) -> &'static str {
        match self {
            RollbackPayload::Created { .. } => "create",
            RollbackPayload::Updated { .. } => "update",
            RollbackPayload::Deleted { .. } => "delete",
        }
    }

    /// Entity type the batch targeted.
    pub fn entity_type(&self) -> &str {
        match self {
            RollbackPayload::Created { entity_type, .. }
            | RollbackPayload::Updated { entity_type, .. }
            | RollbackPayload::Deleted { entity_type, .. } => entity_type,
        }
    }

    /// Number of primary rows the batch touched.
    pub fn rows(&self) -> usize {
        match self {
            RollbackPayload::Created { ids, .. } => ids.len(),
            RollbackPayload::Updated { changes, .. } => changes.len(),
            RollbackPayload::Deleted { snapshots, .. } => snapshots.len(),
        }
    }
}

/// One numbered entry in the log.
#[derive(Debug, Clone, PartialEq)]
pub struct RollbackEntry {
    /// Position in the log, starting at 0.
    pub sequence: usize,
    pub payload: RollbackPayload,
}

/// Append-only list of rollback entries for one run.
#[derive(Debug, Default, Clone)]
pub struct RollbackLog {
    entries: Vec<RollbackEntry>,
}

impl RollbackLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its sequence number.
    pub fn append(&mut self, payload: RollbackPayload) -> usize {
        let sequence = self.entries.len();
        self.entries.push(RollbackEntry { sequence, payload });
        sequence
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in execution order.
    pub fn entries(&self) -> &[RollbackEntry] {
        &self.entries
    }

    /// Entries in undo order.
    pub fn iter_undo(&self) -> impl Iterator<Item = &RollbackEntry> {
        self.entries.iter().rev()
    }

    /// Drop every entry from sequence `len` onwards.
    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

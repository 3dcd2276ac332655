//! Record store for Backstep.
//!
//! The [`Store`] trait is the boundary to the relational store a migration
//! runs against. [`StorageEngine`] is the sled-backed implementation.

mod config;
mod engine;
mod record;
mod savepoint;

pub mod key;

use std::sync::Arc;

pub use config::StorageConfig;
pub use engine::StorageEngine;
pub use key::RecordKey;
pub use record::{Field, Record};
pub use savepoint::Savepoint;

use crate::error::Error;
use crate::selector::Selector;
use crate::value::{Attributes, RecordId};

/// Access to the records a migration reads and mutates.
///
/// Implementations must be safe to share between the migration thread and
/// observers; all methods take `&self`.
pub trait Store: Send + Sync {
    /// Insert a new record and return its assigned identifier.
    fn insert(&self, entity_type: &str, attributes: &Attributes) -> Result<RecordId, Error>;

    /// Write a record under an explicit identifier, replacing any existing
    /// attributes.
    fn put(&self, entity_type: &str, id: RecordId, attributes: &Attributes) -> Result<(), Error>;

    /// Read a record.
    fn get(&self, entity_type: &str, id: RecordId) -> Result<Option<Attributes>, Error>;

    /// Remove a record. Returns whether it existed.
    fn remove(&self, entity_type: &str, id: RecordId) -> Result<bool, Error>;

    /// Return up to `limit` records matching `selector` with identifiers
    /// greater than `after`, in ascending identifier order.
    fn select(
        &self,
        entity_type: &str,
        selector: &Selector,
        after: Option<RecordId>,
        limit: usize,
    ) -> Result<Vec<(RecordId, Attributes)>, Error>;

    /// Count records of an entity type.
    fn count(&self, entity_type: &str) -> Result<u64, Error>;

    /// Open a nested savepoint.
    fn savepoint(&self) -> Result<Savepoint, Error>;

    /// Close the innermost savepoint, keeping its writes.
    fn release_savepoint(&self, savepoint: Savepoint) -> Result<(), Error>;

    /// Close the innermost savepoint, discarding its writes.
    fn rollback_to_savepoint(&self, savepoint: Savepoint) -> Result<(), Error>;

    /// Release cached memory held by the store, if it can.
    fn reclaim(&self) -> Result<(), Error> {
        Ok(())
    }
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn insert(&self, entity_type: &str, attributes: &Attributes) -> Result<RecordId, Error> {
        (**self).insert(entity_type, attributes)
    }

    fn put(&self, entity_type: &str, id: RecordId, attributes: &Attributes) -> Result<(), Error> {
        (**self).put(entity_type, id, attributes)
    }

    fn get(&self, entity_type: &str, id: RecordId) -> Result<Option<Attributes>, Error> {
        (**self).get(entity_type, id)
    }

    fn remove(&self, entity_type: &str, id: RecordId) -> Result<bool, Error> {
        (**self).remove(entity_type, id)
    }

    fn select(
        &self,
        entity_type: &str,
        selector: &Selector,
        after: Option<RecordId>,
        limit: usize,
    ) -> Result<Vec<(RecordId, Attributes)>, Error> {
        (**self).select(entity_type, selector, after, limit)
    }

    fn count(&self, entity_type: &str) -> Result<u64, Error> {
        (**self).count(entity_type)
    }

    fn savepoint(&self) -> Result<Savepoint, Error> {
        (**self).savepoint()
    }

    fn release_savepoint(&self, savepoint: Savepoint) -> Result<(), Error> {
        (**self).release_savepoint(savepoint)
    }

    fn rollback_to_savepoint(&self, savepoint: Savepoint) -> Result<(), Error> {
        (**self).rollback_to_savepoint(savepoint)
    }

    fn reclaim(&self) -> Result<(), Error> {
        (**self).reclaim()
    }
}

//! Storage engine implementation.

use parking_lot::Mutex;
use sled::{Db, IVec, Tree};

use super::key::RecordKey;
use super::savepoint::{Journal, Savepoint};
use super::{Record, StorageConfig, Store};
use crate::error::Error;
use crate::selector::Selector;
use crate::value::{Attributes, RecordId};

/// Tree name for record data.
const DATA_TREE: &str = "data";

/// The record store wrapping sled.
///
/// Records live in one tree keyed by [`RecordKey`], so each entity type is a
/// contiguous, identifier-ordered range. Writes made while a savepoint is
/// open are journaled so the savepoint can be rolled back.
pub struct StorageEngine {
    /// The underlying sled database.
    db: Db,

    /// Tree for record data.
    data_tree: Tree,

    /// Savepoint journal; also serializes writes against rollbacks.
    journal: Mutex<Journal>,
}

impl StorageEngine {
    /// Open or create a storage engine with the given configuration.
    pub fn open(config: StorageConfig) -> Result<Self, Error> {
        let db = config.to_sled_config().open()?;
        let data_tree = db.open_tree(DATA_TREE)?;

        Ok(Self {
            db,
            data_tree,
            journal: Mutex::new(Journal::default()),
        })
    }

    /// Open a temporary engine that is deleted on drop.
    pub fn temporary() -> Result<Self, Error> {
        Self::open(StorageConfig::temporary())
    }

    /// Number of savepoints currently open.
    pub fn savepoint_depth(&self) -> usize {
        self.journal.lock().depth()
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.db.flush()?;
        Ok(())
    }

    /// Write or remove one key, journaling the prior image when a savepoint
    /// is open.
    fn write(&self, key: Vec<u8>, value: Option<Vec<u8>>) -> Result<Option<IVec>, Error> {
        let mut journal = self.journal.lock();
        let before = match value {
            Some(bytes) => self.data_tree.insert(&key, bytes)?,
            None => self.data_tree.remove(&key)?,
        };
        journal.record(key, before.clone());
        Ok(before)
    }

    fn decode_entry(key: &[u8], value: &[u8]) -> Result<(RecordId, Attributes), Error> {
        let key = RecordKey::decode(key).ok_or(Error::InvalidKey)?;
        let record = Record::from_bytes(value)?;
        Ok((key.id, record.into_attributes()))
    }

    fn select_by_ids(
        &self,
        entity_type: &str,
        ids: &[RecordId],
        selector: &Selector,
        after: Option<RecordId>,
        limit: usize,
    ) -> Result<Vec<(RecordId, Attributes)>, Error> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut rows = Vec::new();
        for id in ids.into_iter().filter(|id| after.map_or(true, |a| *id > a)) {
            if rows.len() >= limit {
                break;
            }
            if let Some(attributes) = self.get(entity_type, id)? {
                if selector.matches(id, &attributes) {
                    rows.push((id, attributes));
                }
            }
        }
        Ok(rows)
    }
}

impl Store for StorageEngine {
    fn insert(&self, entity_type: &str, attributes: &Attributes) -> Result<RecordId, Error> {
        // sled ids start at zero; keep zero free so it never looks like a
        // missing foreign key.
        let id = self.db.generate_id()? + 1;
        self.put(entity_type, id, attributes)?;
        Ok(id)
    }

    fn put(&self, entity_type: &str, id: RecordId, attributes: &Attributes) -> Result<(), Error> {
        let key = RecordKey::new(entity_type, id).encode();
        let value = Record::new(attributes).to_bytes()?;
        self.write(key, Some(value))?;
        Ok(())
    }

    fn get(&self, entity_type: &str, id: RecordId) -> Result<Option<Attributes>, Error> {
        let key = RecordKey::new(entity_type, id).encode();
        match self.data_tree.get(key)? {
            Some(bytes) => Ok(Some(Record::from_bytes(&bytes)?.into_attributes())),
            None => Ok(None),
        }
    }

    fn remove(&self, entity_type: &str, id: RecordId) -> Result<bool, Error> {
        let key = RecordKey::new(entity_type, id).encode();
        Ok(self.write(key, None)?.is_some())
    }

    fn select(
        &self,
        entity_type: &str,
        selector: &Selector,
        after: Option<RecordId>,
        limit: usize,
    ) -> Result<Vec<(RecordId, Attributes)>, Error> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        if let Some(ids) = selector.explicit_ids() {
            return self.select_by_ids(entity_type, ids, selector, after, limit);
        }

        let prefix = RecordKey::prefix(entity_type);
        let start = match after {
            Some(id) if id == RecordId::MAX => return Ok(Vec::new()),
            Some(id) => RecordKey::new(entity_type, id + 1).encode(),
            None => prefix.clone(),
        };

        let mut rows = Vec::new();
        for result in self.data_tree.range(start..) {
            let (key, value) = result?;
            if !key.starts_with(&prefix) {
                break;
            }
            let (id, attributes) = Self::decode_entry(&key, &value)?;
            if selector.matches(id, &attributes) {
                rows.push((id, attributes));
                if rows.len() >= limit {
                    break;
                }
            }
        }
        Ok(rows)
    }

    fn count(&self, entity_type: &str) -> Result<u64, Error> {
        let prefix = RecordKey::prefix(entity_type);
        let mut count = 0u64;
        for result in self.data_tree.scan_prefix(&prefix) {
            result?;
            count += 1;
        }
        Ok(count)
    }

    fn savepoint(&self) -> Result<Savepoint, Error> {
        Ok(self.journal.lock().open())
    }

    fn release_savepoint(&self, savepoint: Savepoint) -> Result<(), Error> {
        self.journal.lock().release(savepoint)
    }

    fn rollback_to_savepoint(&self, savepoint: Savepoint) -> Result<(), Error> {
        let mut journal = self.journal.lock();
        let undone = journal.unwind(savepoint)?;
        let restored = undone.len();
        for entry in undone {
            match entry.before {
                Some(bytes) => {
                    self.data_tree.insert(&entry.key, bytes)?;
                }
                None => {
                    self.data_tree.remove(&entry.key)?;
                }
            }
        }
        tracing::debug!(depth = savepoint.depth(), restored, "rolled back savepoint");
        Ok(())
    }

    fn reclaim(&self) -> Result<(), Error> {
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes;

    struct TestDb {
        engine: StorageEngine,
        _dir: tempfile::TempDir, // Keep the temp dir alive
    }

    impl std::ops::Deref for TestDb {
        type Target = StorageEngine;
        fn deref(&self) -> &Self::Target {
            &self.engine
        }
    }

    fn test_engine() -> TestDb {
        let dir = tempfile::tempdir().unwrap();
        let engine = StorageEngine::open(StorageConfig::new(dir.path())).unwrap();
        TestDb { engine, _dir: dir }
    }

    #[test]
    fn test_insert_and_get() {
        let engine = test_engine();
        let attrs = attributes! { "name" => "a", "price" => 100 };

        let id = engine.insert("Widget", &attrs).unwrap();
        assert!(id > 0);
        assert_eq!(engine.get("Widget", id).unwrap(), Some(attrs));
        assert_eq!(engine.get("Gadget", id).unwrap(), None);
    }

    #[test]
    fn test_ids_are_monotonic() {
        let engine = test_engine();
        let a = engine.insert("Widget", &Attributes::new()).unwrap();
        let b = engine.insert("Widget", &Attributes::new()).unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_remove() {
        let engine = test_engine();
        let id = engine.insert("Widget", &attributes! { "name" => "a" }).unwrap();

        assert!(engine.remove("Widget", id).unwrap());
        assert!(!engine.remove("Widget", id).unwrap());
        assert!(engine.get("Widget", id).unwrap().is_none());
    }

    #[test]
    fn test_select_pages_in_id_order() {
        let engine = test_engine();
        let ids: Vec<_> = (0..5)
            .map(|i| engine.insert("Widget", &attributes! { "n" => i }).unwrap())
            .collect();
        engine.insert("Gadget", &attributes! { "n" => 0 }).unwrap();

        let first = engine.select("Widget", &Selector::All, None, 2).unwrap();
        assert_eq!(first.iter().map(|r| r.0).collect::<Vec<_>>(), ids[..2]);

        let rest = engine
            .select("Widget", &Selector::All, Some(ids[1]), 10)
            .unwrap();
        assert_eq!(rest.iter().map(|r| r.0).collect::<Vec<_>>(), ids[2..]);
    }

    #[test]
    fn test_select_filters_and_explicit_ids() {
        let engine = test_engine();
        let a = engine.insert("Widget", &attributes! { "color" => "red" }).unwrap();
        let b = engine.insert("Widget", &attributes! { "color" => "blue" }).unwrap();
        let c = engine.insert("Widget", &attributes! { "color" => "red" }).unwrap();

        let red = engine
            .select("Widget", &Selector::eq("color", "red"), None, 10)
            .unwrap();
        assert_eq!(red.iter().map(|r| r.0).collect::<Vec<_>>(), vec![a, c]);

        let by_id = engine
            .select("Widget", &Selector::ids([c, b, 999]), None, 10)
            .unwrap();
        assert_eq!(by_id.iter().map(|r| r.0).collect::<Vec<_>>(), vec![b, c]);
    }

    #[test]
    fn test_count() {
        let engine = test_engine();
        for _ in 0..3 {
            engine.insert("Widget", &Attributes::new()).unwrap();
        }
        assert_eq!(engine.count("Widget").unwrap(), 3);
        assert_eq!(engine.count("Gadget").unwrap(), 0);
    }

    #[test]
    fn test_savepoint_rollback_restores_state() {
        let engine = test_engine();
        let kept = engine.insert("Widget", &attributes! { "price" => 100 }).unwrap();

        let sp = engine.savepoint().unwrap();
        let added = engine.insert("Widget", &attributes! { "price" => 1 }).unwrap();
        engine.put("Widget", kept, &attributes! { "price" => 200 }).unwrap();
        engine.rollback_to_savepoint(sp).unwrap();

        assert!(engine.get("Widget", added).unwrap().is_none());
        assert_eq!(
            engine.get("Widget", kept).unwrap(),
            Some(attributes! { "price" => 100 })
        );
        assert_eq!(engine.savepoint_depth(), 0);
    }

    #[test]
    fn test_nested_savepoint_leaves_outer_writes() {
        let engine = test_engine();

        let outer = engine.savepoint().unwrap();
        let outer_id = engine.insert("Widget", &attributes! { "n" => 1 }).unwrap();

        let inner = engine.savepoint().unwrap();
        let inner_id = engine.insert("Widget", &attributes! { "n" => 2 }).unwrap();
        engine.rollback_to_savepoint(inner).unwrap();

        assert!(engine.get("Widget", outer_id).unwrap().is_some());
        assert!(engine.get("Widget", inner_id).unwrap().is_none());

        engine.rollback_to_savepoint(outer).unwrap();
        assert!(engine.get("Widget", outer_id).unwrap().is_none());
    }

    #[test]
    fn test_release_keeps_writes() {
        let engine = test_engine();
        let sp = engine.savepoint().unwrap();
        let id = engine.insert("Widget", &Attributes::new()).unwrap();
        engine.release_savepoint(sp).unwrap();

        assert!(engine.get("Widget", id).unwrap().is_some());
        assert!(engine.rollback_to_savepoint(sp).is_err());
    }

    #[test]
    fn test_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::new(dir.path());
        let attrs = attributes! { "name" => "kept" };

        let id = {
            let engine = StorageEngine::open(config.clone()).unwrap();
            let id = engine.insert("Widget", &attrs).unwrap();
            engine.flush().unwrap();
            id
        };

        let engine = StorageEngine::open(config).unwrap();
        assert_eq!(engine.get("Widget", id).unwrap(), Some(attrs));
    }
}

//! The contract a data migration implements.

use crate::engine::{EngineError, ReversibleEngine};
use crate::error::Error;
use crate::storage::Store;

/// A forward-only bulk data migration.
///
/// `up` expresses the whole transformation through the engine's mutation
/// primitives; the engine makes it reversible as a unit. There is no
/// hand-written inverse: `down` always fails, and a committed migration is
/// undone by restoring from backup.
pub trait Migration<S: Store>: Send + Sync {
    /// Name used for locking, logs and reports.
    fn name(&self) -> &str;

    /// Number of records the migration expects to process, for progress
    /// reporting. Zero when unknown.
    fn expected_records(&self, _store: &S) -> Result<u64, Error> {
        Ok(0)
    }

    /// Apply the migration.
    fn up(&self, engine: &mut ReversibleEngine<S>) -> Result<(), EngineError>;

    /// Migrations are irreversible by design.
    fn down(&self) -> Result<(), EngineError> {
        Err(EngineError::IrreversibleByDesign(self.name().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageEngine;

    struct Noop;

    impl Migration<StorageEngine> for Noop {
        fn name(&self) -> &str {
            "noop"
        }

        fn up(&self, _engine: &mut ReversibleEngine<StorageEngine>) -> Result<(), EngineError> {
            Ok(())
        }
    }

    #[test]
    fn test_down_is_irreversible() {
        match Noop.down() {
            Err(EngineError::IrreversibleByDesign(name)) => assert_eq!(name, "noop"),
            other => panic!("expected irreversible error, got {other:?}"),
        }
    }

    #[test]
    fn test_expected_records_defaults_to_zero() {
        let store = StorageEngine::temporary().unwrap();
        assert_eq!(Noop.expected_records(&store).unwrap(), 0);
    }
}

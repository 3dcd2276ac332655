//! Engine error types.

use thiserror::Error;

use crate::error::{ConfigError, Error as StoreError};

/// Transient store failures that are worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryableError {
    /// Timed out waiting for a row or table lock.
    #[error("lock wait timeout: {0}")]
    LockTimeout(String),

    /// The store aborted the batch to break a deadlock.
    #[error("deadlock detected: {0}")]
    Deadlock(String),

    /// No connection became available in time.
    #[error("connection pool timeout: {0}")]
    PoolTimeout(String),
}

/// Where an undo stopped.
#[derive(Debug)]
pub struct RollbackFailure {
    /// Sequence number of the entry that could not be undone, `None` when
    /// restoring the savepoint itself failed.
    pub sequence: Option<usize>,
    /// Operation recorded by that entry (`create`, `update`, `delete`), or
    /// `savepoint`.
    pub operation: &'static str,
    /// Why undoing it failed.
    pub error: Box<EngineError>,
}

impl std::fmt::Display for RollbackFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.sequence {
            Some(sequence) => write!(
                f,
                "undo of entry {} ({}) failed: {}",
                sequence, self.operation, self.error
            ),
            None => write!(f, "{} rollback failed: {}", self.operation, self.error),
        }
    }
}

/// Errors raised by the reversible engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A transient failure; see [`EngineError::is_retryable`].
    #[error(transparent)]
    Retryable(#[from] RetryableError),

    /// Record store failure.
    #[error(transparent)]
    Storage(#[from] StoreError),

    /// Failure raised by the migration body itself.
    #[error("migration body failed: {0}")]
    Body(Box<dyn std::error::Error + Send + Sync>),

    /// The migration body gave up.
    #[error("migration aborted: {0}")]
    Aborted(String),

    /// An integrity check failed after the body completed.
    #[error("integrity violation ({check}): {message}")]
    IntegrityViolation {
        /// Name of the failing check or relation.
        check: String,
        /// Description of the violation.
        message: String,
    },

    /// The run failed and undoing its changes failed too. Manual
    /// intervention is required.
    #[error("rollback failed after error ({source}); {rollback}; manual intervention required")]
    RollbackFailed {
        /// The error that triggered the rollback.
        source: Box<EngineError>,
        /// Where the undo stopped.
        rollback: RollbackFailure,
    },

    /// `run` was called while a run is in progress.
    #[error("a migration run is already in progress")]
    AlreadyRunning,

    /// Migrations are forward only.
    #[error("migration {0} is irreversible by design; restore from backup instead")]
    IrreversibleByDesign(String),

    /// `delete` named a relation the engine does not know for the entity.
    #[error("unknown relation {relation} for entity {entity_type}")]
    UnknownRelation {
        /// Entity type being deleted.
        entity_type: String,
        /// Relation name that was requested.
        relation: String,
    },

    /// A batch size of zero was requested.
    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    /// Invalid engine or load control configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Wrap a caller error raised inside a migration body.
    pub fn body<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        EngineError::Body(Box::new(error))
    }

    /// Whether retrying the failed block may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Retryable(_))
    }

    /// Short, stable name of the error class for logs and reports.
    pub fn class(&self) -> &'static str {
        match self {
            EngineError::Retryable(RetryableError::LockTimeout(_)) => "lock_timeout",
            EngineError::Retryable(RetryableError::Deadlock(_)) => "deadlock",
            EngineError::Retryable(RetryableError::PoolTimeout(_)) => "pool_timeout",
            EngineError::Storage(_) => "storage",
            EngineError::Body(_) => "body",
            EngineError::Aborted(_) => "aborted",
            EngineError::IntegrityViolation { .. } => "integrity_violation",
            EngineError::RollbackFailed { .. } => "rollback_failed",
            EngineError::AlreadyRunning => "already_running",
            EngineError::IrreversibleByDesign(_) => "irreversible",
            EngineError::UnknownRelation { .. } => "unknown_relation",
            EngineError::InvalidBatchSize => "invalid_batch_size",
            EngineError::Config(_) => "config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(EngineError::from(RetryableError::Deadlock("t1".into())).is_retryable());
        assert!(EngineError::from(RetryableError::LockTimeout("orders".into())).is_retryable());
        assert!(EngineError::from(RetryableError::PoolTimeout("5s".into())).is_retryable());

        assert!(!EngineError::Aborted("stop".into()).is_retryable());
        assert!(!EngineError::from(StoreError::InvalidKey).is_retryable());
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        assert!(!EngineError::body(io).is_retryable());
    }

    #[test]
    fn test_rollback_failed_message() {
        let err = EngineError::RollbackFailed {
            source: Box::new(EngineError::Aborted("bad row".into())),
            rollback: RollbackFailure {
                sequence: Some(3),
                operation: "delete",
                error: Box::new(EngineError::from(StoreError::InvalidKey)),
            },
        };
        let message = err.to_string();
        assert!(message.contains("bad row"));
        assert!(message.contains("entry 3 (delete)"));
        assert!(message.contains("manual intervention"));
        assert_eq!(err.class(), "rollback_failed");
    }
}

//! Runner error types.

use backstep_core::EngineError;
use backstep_monitor::{MonitorError, Report};
use thiserror::Error;

/// Errors raised while running a migration.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Another run holds the migration's lock.
    #[error("migration lock unavailable: {0}")]
    LockUnavailable(String),

    /// The migration failed and its changes were rolled back, or the
    /// rollback itself failed.
    #[error("migration failed: {source}")]
    Engine {
        /// What went wrong in the engine.
        source: EngineError,
        /// Report of the failed run, when monitoring could produce one.
        report: Option<Box<Report>>,
    },

    /// Monitoring could not be started or stopped.
    #[error("monitor error: {0}")]
    Monitor(#[from] MonitorError),

    /// The store failed outside of a run.
    #[error("storage error: {0}")]
    Storage(#[from] backstep_core::Error),
}

impl RunnerError {
    /// The engine error behind a failed run, if that is what this is.
    pub fn engine_error(&self) -> Option<&EngineError> {
        match self {
            RunnerError::Engine { source, .. } => Some(source),
            _ => None,
        }
    }

    /// The report of a failed run, if one was produced.
    pub fn report(&self) -> Option<&Report> {
        match self {
            RunnerError::Engine { report, .. } => report.as_deref(),
            _ => None,
        }
    }
}

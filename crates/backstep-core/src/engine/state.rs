//! Run state and the per-run execution record.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a reversible engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    /// No run has started.
    Idle,
    /// The migration body is executing.
    Running,
    /// The body failed and its changes are being undone.
    RollbackInProgress,
    /// The body finished and integrity checks are running.
    Verifying,
    /// The run committed.
    Succeeded,
    /// The run failed and was rolled back (or the rollback failed).
    Failed,
}

impl EngineState {
    /// Whether the run has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineState::Succeeded | EngineState::Failed)
    }

    /// Whether a new run may start from this state.
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            EngineState::Idle | EngineState::Succeeded | EngineState::Failed
        )
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Idle => write!(f, "idle"),
            EngineState::Running => write!(f, "running"),
            EngineState::RollbackInProgress => write!(f, "rollback_in_progress"),
            EngineState::Verifying => write!(f, "verifying"),
            EngineState::Succeeded => write!(f, "succeeded"),
            EngineState::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome recorded for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Failed,
    RollbackFailed,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Success => write!(f, "success"),
            ExecutionStatus::Failed => write!(f, "failed"),
            ExecutionStatus::RollbackFailed => write!(f, "rollback_failed"),
        }
    }
}

/// Summary of one finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    /// Name of the migration.
    pub migration: String,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    /// Rollback entries recorded by the run.
    pub rollback_entries: usize,
    /// Error class on failure.
    pub error_class: Option<String>,
    /// Error message on failure.
    pub error_message: Option<String>,
}

//! Monitor error types.

use std::path::PathBuf;

use backstep_core::ConfigError;
use thiserror::Error;

use crate::session::SessionHandle;

/// Errors raised by the migration monitor.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// No active session has this handle.
    #[error("unknown monitoring session: {0}")]
    UnknownSession(SessionHandle),

    /// A progress update reported fewer processed rows than before.
    #[error("processed count went backwards: {previous} -> {attempted}")]
    ProgressRegressed {
        /// Count recorded so far.
        previous: u64,
        /// Count in the rejected update.
        attempted: u64,
    },

    /// Background monitoring needs a tokio runtime.
    #[error("background monitoring requires a tokio runtime")]
    NoRuntime,

    /// The session store failed.
    #[error("session store error: {0}")]
    Store(String),

    /// A session or report could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A report file could not be written.
    #[error("failed to write report {path}: {source}")]
    ReportIo {
        /// Target file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Invalid monitor configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

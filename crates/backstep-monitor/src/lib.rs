//! Backstep Monitor - progress tracking, alerting and reports for migrations.
//!
//! A [`MigrationMonitor`] follows named runs: it records progress, errors and
//! performance samples, raises alerts when a run stalls, fails too often,
//! slows down or strains the process, and writes a JSON report when the run
//! ends. [`MonitorProgress`] connects a session to a
//! [`ReversibleEngine`](backstep_core::ReversibleEngine).

pub mod alert;
pub mod clock;
pub mod config;
pub mod error;
pub mod monitor;
pub mod progress;
pub mod report;
pub mod session;
pub mod store;

pub use alert::{Alert, AlertKind, AlertRouter, CollectingNotifier, Notifier, Severity, TracingNotifier};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::MonitorConfig;
pub use error::{MonitorError, Result};
pub use monitor::{MigrationMonitor, ProgressError, StatusSnapshot};
pub use progress::MonitorProgress;
pub use report::{format_percent, PerformanceSummary, Report, ReportWriter};
pub use session::{ErrorRecord, MonitorSession, SessionHandle, SessionStatus};
pub use store::{MemorySessionStore, SessionStore};

//! Bridge from engine progress to a monitoring session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use backstep_core::{PerformanceSample, ProgressSink, RecordId};
use tracing::warn;

use crate::monitor::{MigrationMonitor, ProgressError};
use crate::session::SessionHandle;

/// Feeds engine batches into a session as a running total.
pub struct MonitorProgress {
    monitor: Arc<MigrationMonitor>,
    handle: SessionHandle,
    processed: AtomicU64,
}

impl MonitorProgress {
    pub fn new(monitor: Arc<MigrationMonitor>, handle: SessionHandle) -> Self {
        Self {
            monitor,
            handle,
            processed: AtomicU64::new(0),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle
    }

    /// Rows reported so far.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Acquire)
    }
}

impl ProgressSink for MonitorProgress {
    fn on_batch(&self, rows: u64, sample: Option<&PerformanceSample>) {
        let total = self.processed.fetch_add(rows, Ordering::AcqRel) + rows;
        if let Err(e) = self
            .monitor
            .update_progress(self.handle, total, None, sample.cloned())
        {
            warn!(session = %self.handle, error = %e, "Failed to record batch progress");
        }
    }

    fn on_error(&self, message: &str, entity_id: Option<RecordId>) {
        let error = ProgressError {
            message: message.to_string(),
            entity_id,
        };
        if let Err(e) = self.monitor.record_error(self.handle, error) {
            warn!(session = %self.handle, error = %e, "Failed to record migration error");
        }
    }
}

impl std::fmt::Debug for MonitorProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorProgress")
            .field("handle", &self.handle)
            .field("processed", &self.processed())
            .finish()
    }
}

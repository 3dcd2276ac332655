//! Live state of one monitored run.

use std::time::Duration;

use backstep_core::{PerformanceSample, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alert::Alert;

/// Identifies a monitoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle(Uuid);

impl SessionHandle {
    /// Create a fresh, random handle.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Key under which the session is persisted.
    pub fn store_key(&self) -> String {
        format!("migration_monitor:{}", self.0)
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Running => write!(f, "running"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A failure reported during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub entity_id: Option<RecordId>,
}

/// Everything known about one monitored run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSession {
    pub handle: SessionHandle,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub total_records: u64,
    pub processed: u64,
    pub last_progress_at: DateTime<Utc>,
    pub errors: Vec<ErrorRecord>,
    pub samples: Vec<PerformanceSample>,
    pub alerts: Vec<Alert>,
    pub status: SessionStatus,
}

impl MonitorSession {
    /// Start a running session at `now`.
    pub fn new(
        handle: SessionHandle,
        name: impl Into<String>,
        total_records: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            handle,
            name: name.into(),
            started_at: now,
            total_records,
            processed: 0,
            last_progress_at: now,
            errors: Vec::new(),
            samples: Vec::new(),
            alerts: Vec::new(),
            status: SessionStatus::Running,
        }
    }

    /// Errors per processed row, 0 before anything is processed.
    pub fn error_rate(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            self.errors.len() as f64 / self.processed as f64
        }
    }

    /// Share of expected rows processed, in percent. 0 when the total is
    /// unknown.
    pub fn percent_complete(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            (self.processed as f64 / self.total_records as f64 * 100.0).min(100.0)
        }
    }

    /// Time since the session started.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        (now - self.started_at).to_std().unwrap_or_default()
    }

    /// Time since the last progress update.
    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        (now - self.last_progress_at).to_std().unwrap_or_default()
    }

    /// Rows per second since the session started.
    pub fn processing_rate(&self, now: DateTime<Utc>) -> f64 {
        let secs = self.elapsed(now).as_secs_f64();
        if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        }
    }

    /// Estimated time to completion at the current rate.
    pub fn eta(&self, now: DateTime<Utc>) -> Option<Duration> {
        let remaining = self.total_records.checked_sub(self.processed)?;
        let rate = self.processing_rate(now);
        if remaining == 0 || rate <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(remaining as f64 / rate))
    }

    /// Append a sample, dropping the oldest beyond `max`.
    pub fn push_sample(&mut self, sample: PerformanceSample, max: usize) {
        self.samples.push(sample);
        if self.samples.len() > max {
            let excess = self.samples.len() - max;
            self.samples.drain(..excess);
        }
    }

    /// Mean throughput of the last `n` samples, once at least `n` exist.
    pub fn recent_throughput(&self, n: usize) -> Option<f64> {
        if n == 0 || self.samples.len() < n {
            return None;
        }
        let recent = &self.samples[self.samples.len() - n..];
        Some(recent.iter().map(|s| s.throughput).sum::<f64>() / n as f64)
    }
}

//! Final run reports.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{MonitorError, Result};
use crate::session::{MonitorSession, SessionStatus};

/// Throughput figures over a session's samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub average_throughput: f64,
    pub peak_throughput: f64,
    pub sample_count: usize,
}

impl PerformanceSummary {
    fn from_session(session: &MonitorSession) -> Self {
        let sample_count = session.samples.len();
        if sample_count == 0 {
            return Self {
                average_throughput: 0.0,
                peak_throughput: 0.0,
                sample_count,
            };
        }
        let throughputs = session.samples.iter().map(|s| s.throughput);
        let total: f64 = throughputs.clone().sum();
        let peak = throughputs.fold(0.0, f64::max);
        Self {
            average_throughput: round2(total / sample_count as f64),
            peak_throughput: round2(peak),
            sample_count,
        }
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub name: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Seconds between start and completion.
    pub duration: f64,
    pub total_records: u64,
    pub processed: u64,
    pub error_count: usize,
    /// Error rate as a percentage string, e.g. `"1.0%"`.
    pub error_rate: String,
    pub alert_count: usize,
    pub performance_summary: PerformanceSummary,
}

impl Report {
    /// Build the report for `session` finishing at `completed_at`.
    pub fn from_session(
        session: &MonitorSession,
        status: SessionStatus,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: session.name.clone(),
            status,
            started_at: session.started_at,
            completed_at,
            duration: round2(session.elapsed(completed_at).as_secs_f64()),
            total_records: session.total_records,
            processed: session.processed,
            error_count: session.errors.len(),
            error_rate: format_percent(session.error_rate()),
            alert_count: session.alerts.len(),
            performance_summary: PerformanceSummary::from_session(session),
        }
    }

    /// File name the report is written under.
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}.json",
            self.name,
            self.completed_at.format("%Y%m%d_%H%M%S")
        )
    }
}

/// Format a ratio as a percentage with up to two decimals, keeping at least
/// one: `0.01` is `"1.0%"`, `0.0625` is `"6.25%"`.
pub fn format_percent(ratio: f64) -> String {
    let percent = round2(ratio * 100.0);
    if percent.fract() == 0.0 {
        format!("{percent:.1}%")
    } else {
        format!("{percent}%")
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Writes reports as JSON files into a directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `report` and return the file path.
    pub fn write(&self, report: &Report) -> Result<PathBuf> {
        let path = self.dir.join(report.file_name());
        std::fs::create_dir_all(&self.dir).map_err(|source| MonitorError::ReportIo {
            path: self.dir.clone(),
            source,
        })?;
        let body = serde_json::to_vec_pretty(report)?;
        std::fs::write(&path, body).map_err(|source| MonitorError::ReportIo {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), migration = %report.name, "Migration report written");
        Ok(path)
    }
}

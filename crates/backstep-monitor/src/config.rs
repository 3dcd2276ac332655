//! Monitor configuration.

use std::path::PathBuf;
use std::time::Duration;

use backstep_core::ConfigError;

/// Settings for the [`MigrationMonitor`](crate::MigrationMonitor).
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Period of the background health check.
    pub check_interval: Duration,

    /// Time without progress after which a session counts as stalled.
    pub stall_timeout: Duration,

    /// Error rate (errors / processed) above which an alert is raised.
    pub error_rate_threshold: f64,

    /// Mean throughput (rows/s) below which processing counts as slow.
    pub slow_throughput: f64,

    /// Number of recent samples averaged for the slow-processing check.
    pub slow_window: usize,

    /// Process CPU usage (percent) that raises an alert.
    pub cpu_alert_threshold: f64,

    /// Process memory usage (percent) that raises an alert.
    pub memory_alert_threshold: f64,

    /// Samples retained per session.
    pub max_samples: usize,

    /// How long persisted sessions survive in the session store.
    pub session_ttl: Duration,

    /// Directory report files are written to; `None` disables them.
    pub reports_dir: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(30),
            stall_timeout: Duration::from_secs(300),
            error_rate_threshold: 0.05,
            slow_throughput: 1.0,
            slow_window: 5,
            cpu_alert_threshold: 80.0,
            memory_alert_threshold: 80.0,
            max_samples: 100,
            session_ttl: Duration::from_secs(24 * 60 * 60),
            reports_dir: None,
        }
    }
}

impl MonitorConfig {
    /// Set the background check period.
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Set the stall timeout.
    pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = timeout;
        self
    }

    /// Set the error rate threshold.
    pub fn with_error_rate_threshold(mut self, threshold: f64) -> Self {
        self.error_rate_threshold = threshold;
        self
    }

    /// Set the resource alert thresholds in percent.
    pub fn with_resource_thresholds(mut self, cpu: f64, memory: f64) -> Self {
        self.cpu_alert_threshold = cpu;
        self.memory_alert_threshold = memory;
        self
    }

    /// Set the session TTL.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Write report files into `dir`.
    pub fn with_reports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reports_dir = Some(dir.into());
        self
    }

    /// Check that intervals and thresholds are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.check_interval.is_zero() {
            return Err(ConfigError::OutOfRange {
                name: "check_interval",
                value: 0.0,
                range: "> 0s",
            });
        }
        if !(self.error_rate_threshold >= 0.0 && self.error_rate_threshold <= 1.0) {
            return Err(ConfigError::OutOfRange {
                name: "error_rate_threshold",
                value: self.error_rate_threshold,
                range: "[0, 1]",
            });
        }
        for (name, value) in [
            ("cpu_alert_threshold", self.cpu_alert_threshold),
            ("memory_alert_threshold", self.memory_alert_threshold),
        ] {
            if !(value > 0.0 && value <= 100.0) {
                return Err(ConfigError::OutOfRange {
                    name,
                    value,
                    range: "(0, 100]",
                });
            }
        }
        if self.slow_window == 0 || self.max_samples < self.slow_window {
            return Err(ConfigError::OutOfRange {
                name: "slow_window",
                value: self.slow_window as f64,
                range: "[1, max_samples]",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.check_interval, Duration::from_secs(30));
        assert_eq!(config.stall_timeout, Duration::from_secs(300));
        assert_eq!(config.session_ttl, Duration::from_secs(86_400));
        assert!(config.reports_dir.is_none());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(MonitorConfig::default()
            .with_check_interval(Duration::ZERO)
            .validate()
            .is_err());
        assert!(MonitorConfig::default()
            .with_error_rate_threshold(1.5)
            .validate()
            .is_err());
        assert!(MonitorConfig::default()
            .with_resource_thresholds(80.0, 0.0)
            .validate()
            .is_err());
    }
}

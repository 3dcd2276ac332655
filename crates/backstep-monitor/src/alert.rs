//! Alerts and their delivery.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{error, info, warn};

/// What an alert is about.
///
/// Serialized as its type name, e.g. `"high_error_rate"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AlertKind {
    /// No progress within the stall timeout.
    Stalled,
    /// Too many failed records.
    HighErrorRate,
    /// Recent throughput is below the slow threshold.
    SlowProcessing,
    /// Process CPU usage is high.
    HighCpu,
    /// Process memory usage is high.
    HighMemory,
    /// Anything raised by callers.
    Custom(String),
}

impl AlertKind {
    /// Kind for a type name. Known names map to their own variants.
    pub fn from_name(name: &str) -> Self {
        match name {
            "stalled" => AlertKind::Stalled,
            "high_error_rate" => AlertKind::HighErrorRate,
            "slow_processing" => AlertKind::SlowProcessing,
            "high_cpu" => AlertKind::HighCpu,
            "high_memory" => AlertKind::HighMemory,
            other => AlertKind::Custom(other.to_string()),
        }
    }

    /// Replace a `Custom` kind carrying a known name by its variant.
    pub fn normalized(self) -> Self {
        match self {
            AlertKind::Custom(name) => AlertKind::from_name(&name),
            kind => kind,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AlertKind::Stalled => "stalled",
            AlertKind::HighErrorRate => "high_error_rate",
            AlertKind::SlowProcessing => "slow_processing",
            AlertKind::HighCpu => "high_cpu",
            AlertKind::HighMemory => "high_memory",
            AlertKind::Custom(kind) => kind,
        }
    }

    /// Severity is fixed per type name.
    pub fn severity(&self) -> Severity {
        match self {
            AlertKind::Custom(name) => match AlertKind::from_name(name) {
                AlertKind::Custom(_) => Severity::Info,
                known => known.severity(),
            },
            AlertKind::Stalled | AlertKind::HighErrorRate => Severity::Critical,
            AlertKind::HighCpu | AlertKind::HighMemory | AlertKind::SlowProcessing => {
                Severity::Warning
            }
        }
    }
}

impl From<&str> for AlertKind {
    fn from(name: &str) -> Self {
        AlertKind::from_name(name)
    }
}

impl Serialize for AlertKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AlertKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(AlertKind::from_name(&name))
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How urgent an alert is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// An anomaly raised during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    pub fn new(kind: AlertKind, message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        let kind = kind.normalized();
        Self {
            severity: kind.severity(),
            kind,
            message: message.into(),
            timestamp,
        }
    }
}

/// Delivers alerts somewhere a human will see them.
pub trait Notifier: Send + Sync {
    fn notify(&self, migration: &str, alert: &Alert);
}

/// Logs alerts through `tracing` at a level matching their severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, migration: &str, alert: &Alert) {
        match alert.severity {
            Severity::Critical => error!(
                migration,
                kind = %alert.kind,
                alert = %alert.message,
                "Critical migration alert"
            ),
            Severity::Warning => warn!(
                migration,
                kind = %alert.kind,
                alert = %alert.message,
                "Migration alert"
            ),
            Severity::Info => info!(
                migration,
                kind = %alert.kind,
                alert = %alert.message,
                "Migration notice"
            ),
        }
    }
}

/// Keeps every alert it receives.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    received: Mutex<Vec<(String, Alert)>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alerts received so far with their migration names.
    pub fn received(&self) -> Vec<(String, Alert)> {
        self.received.lock().clone()
    }

    /// Kinds of the alerts received so far.
    pub fn kinds(&self) -> Vec<AlertKind> {
        self.received
            .lock()
            .iter()
            .map(|(_, alert)| alert.kind.clone())
            .collect()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, migration: &str, alert: &Alert) {
        self.received
            .lock()
            .push((migration.to_string(), alert.clone()));
    }
}

/// Sends critical alerts to one notifier and everything else to another.
#[derive(Clone)]
pub struct AlertRouter {
    critical: Arc<dyn Notifier>,
    standard: Arc<dyn Notifier>,
}

impl AlertRouter {
    pub fn new(critical: Arc<dyn Notifier>, standard: Arc<dyn Notifier>) -> Self {
        Self { critical, standard }
    }

    pub fn route(&self, migration: &str, alert: &Alert) {
        if alert.severity == Severity::Critical {
            self.critical.notify(migration, alert);
        } else {
            self.standard.notify(migration, alert);
        }
    }
}

impl Default for AlertRouter {
    fn default() -> Self {
        Self::new(Arc::new(TracingNotifier), Arc::new(TracingNotifier))
    }
}

impl std::fmt::Debug for AlertRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertRouter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_mapping() {
        assert_eq!(AlertKind::Stalled.severity(), Severity::Critical);
        assert_eq!(AlertKind::HighErrorRate.severity(), Severity::Critical);
        assert_eq!(AlertKind::HighCpu.severity(), Severity::Warning);
        assert_eq!(AlertKind::HighMemory.severity(), Severity::Warning);
        assert_eq!(AlertKind::SlowProcessing.severity(), Severity::Warning);
        assert_eq!(AlertKind::Custom("note".into()).severity(), Severity::Info);
    }

    #[test]
    fn test_routing_by_severity() {
        let critical = Arc::new(CollectingNotifier::new());
        let standard = Arc::new(CollectingNotifier::new());
        let router = AlertRouter::new(critical.clone(), standard.clone());
        let now = Utc::now();

        router.route("m", &Alert::new(AlertKind::Stalled, "no progress", now));
        router.route("m", &Alert::new(AlertKind::HighCpu, "cpu 95%", now));
        router.route("m", &Alert::new(AlertKind::Custom("note".into()), "fyi", now));

        assert_eq!(critical.kinds(), vec![AlertKind::Stalled]);
        assert_eq!(
            standard.kinds(),
            vec![AlertKind::HighCpu, AlertKind::Custom("note".into())]
        );
    }

    #[test]
    fn test_alert_serialization() {
        let alert = Alert::new(AlertKind::HighErrorRate, "6.0%", Utc::now());
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["type"], "high_error_rate");
        assert_eq!(json["severity"], "critical");
    }

    #[test]
    fn test_custom_kind_with_known_name() {
        let kind = AlertKind::Custom("stalled".into());
        assert_eq!(kind.severity(), Severity::Critical);

        let alert = Alert::new(kind, "no progress", Utc::now());
        assert_eq!(alert.kind, AlertKind::Stalled);
        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(AlertKind::from("high_cpu"), AlertKind::HighCpu);
    }

    #[test]
    fn test_custom_kind_serializes_flat() {
        let alert = Alert::new(AlertKind::Custom("checkpoint".into()), "halfway", Utc::now());
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["type"], "checkpoint");
        assert_eq!(json["severity"], "info");

        let back: Alert = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind, AlertKind::Custom("checkpoint".into()));
    }
}

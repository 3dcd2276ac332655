//! The migration monitor.
//!
//! Tracks named runs, raises alerts when progress stalls, errors pile up,
//! throughput collapses or the process runs hot, and produces a report when
//! a run ends. Each session can have a background health check that runs on
//! a tokio interval until the session is stopped.

use std::sync::Arc;
use std::time::Duration;

use backstep_core::{PerformanceSample, RecordId, ResourceSampler, SystemSampler};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::alert::{Alert, AlertKind, AlertRouter, Notifier};
use crate::clock::{Clock, SystemClock};
use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::report::{format_percent, Report, ReportWriter};
use crate::session::{ErrorRecord, MonitorSession, SessionHandle, SessionStatus};
use crate::store::{MemorySessionStore, SessionStore};

/// A failure reported with a progress update.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressError {
    pub message: String,
    pub entity_id: Option<RecordId>,
}

impl ProgressError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            entity_id: None,
        }
    }

    pub fn with_entity(mut self, id: RecordId) -> Self {
        self.entity_id = Some(id);
        self
    }
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub name: String,
    pub status: SessionStatus,
    pub percent_complete: f64,
    pub processed: u64,
    pub total_records: u64,
    pub error_count: usize,
    pub error_rate: f64,
    pub alert_count: usize,
    pub elapsed: Duration,
    /// `None` when nothing has been processed yet or the run is complete.
    pub eta: Option<Duration>,
    pub latest_sample: Option<PerformanceSample>,
}

type SharedSession = Arc<Mutex<MonitorSession>>;

struct ActiveSession {
    state: SharedSession,
    cancel: CancellationToken,
}

/// Everything a health check needs, shared with background tasks.
#[derive(Clone)]
struct Checker {
    config: Arc<MonitorConfig>,
    store: Arc<dyn SessionStore>,
    sampler: Arc<dyn ResourceSampler>,
    clock: Arc<dyn Clock>,
    router: AlertRouter,
}

impl Checker {
    fn persist(&self, session: &MonitorSession) -> Result<()> {
        self.store
            .set(&session.handle.store_key(), session, self.config.session_ttl)
    }

    fn deliver(&self, migration: &str, alerts: &[Alert]) {
        for alert in alerts {
            self.router.route(migration, alert);
        }
    }

    /// Stall detection and resource sampling for one session.
    ///
    /// The session lock is held while persisting so a concurrent stop cannot
    /// be overwritten by a stale snapshot.
    fn health_check(&self, state: &Mutex<MonitorSession>) -> Result<Vec<Alert>> {
        let now = self.clock.now();
        let usage = self.sampler.sample();

        let (name, processed, alerts) = {
            let mut session = state.lock();
            if session.status != SessionStatus::Running {
                return Ok(Vec::new());
            }

            let mut alerts = Vec::new();
            let idle = session.idle_for(now);
            if idle >= self.config.stall_timeout {
                alerts.push(Alert::new(
                    AlertKind::Stalled,
                    format!("No progress for {} seconds", idle.as_secs()),
                    now,
                ));
            }
            if usage.cpu_percent > self.config.cpu_alert_threshold {
                alerts.push(Alert::new(
                    AlertKind::HighCpu,
                    format!("CPU usage at {:.1}%", usage.cpu_percent),
                    now,
                ));
            }
            if usage.memory_percent > self.config.memory_alert_threshold {
                alerts.push(Alert::new(
                    AlertKind::HighMemory,
                    format!("Memory usage at {:.1}%", usage.memory_percent),
                    now,
                ));
            }
            session.alerts.extend(alerts.iter().cloned());
            self.persist(&session)?;
            (session.name.clone(), session.processed, alerts)
        };

        self.deliver(&name, &alerts);
        debug!(
            migration = %name,
            processed,
            cpu_percent = usage.cpu_percent,
            memory_percent = usage.memory_percent,
            alerts = alerts.len(),
            "Health check complete"
        );
        Ok(alerts)
    }
}

/// Observes migration runs and reports on them.
pub struct MigrationMonitor {
    checker: Checker,
    sessions: DashMap<SessionHandle, ActiveSession>,
    writer: Option<ReportWriter>,
    runtime: Option<Handle>,
    custom_store: bool,
}

impl MigrationMonitor {
    /// Create a monitor with an in-memory session store, the system sampler
    /// and clock, and alerts logged through `tracing`.
    pub fn new(config: MonitorConfig) -> Result<Self> {
        config.validate()?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Ok(Self {
            writer: config.reports_dir.clone().map(ReportWriter::new),
            checker: Checker {
                store: Arc::new(MemorySessionStore::with_clock(Arc::clone(&clock))),
                sampler: Arc::new(SystemSampler::new()),
                clock,
                router: AlertRouter::default(),
                config: Arc::new(config),
            },
            sessions: DashMap::new(),
            runtime: None,
            custom_store: false,
        })
    }

    /// Persist sessions in `store`.
    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.checker.store = store;
        self.custom_store = true;
        self
    }

    /// Sample process resources through `sampler`.
    pub fn with_sampler(mut self, sampler: Arc<dyn ResourceSampler>) -> Self {
        self.checker.sampler = sampler;
        self
    }

    /// Read time from `clock`. The default session store follows it too.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        if !self.custom_store {
            self.checker.store = Arc::new(MemorySessionStore::with_clock(Arc::clone(&clock)));
        }
        self.checker.clock = clock;
        self
    }

    /// Deliver critical alerts to `critical` and all others to `standard`.
    pub fn with_notifiers(mut self, critical: Arc<dyn Notifier>, standard: Arc<dyn Notifier>) -> Self {
        self.checker.router = AlertRouter::new(critical, standard);
        self
    }

    /// Spawn background checks on `runtime` instead of the ambient one.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.checker.config
    }

    /// Number of sessions being monitored.
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Begin monitoring a run expected to process `total_records` rows.
    ///
    /// With `background` set, a health check runs every `check_interval` on
    /// the tokio runtime until the session is stopped.
    pub fn start_monitoring(
        &self,
        name: &str,
        total_records: u64,
        background: bool,
    ) -> Result<SessionHandle> {
        let runtime = if background {
            Some(
                self.runtime
                    .clone()
                    .or_else(|| Handle::try_current().ok())
                    .ok_or(MonitorError::NoRuntime)?,
            )
        } else {
            None
        };

        let handle = SessionHandle::new();
        let session = MonitorSession::new(handle, name, total_records, self.checker.clock.now());
        self.checker.persist(&session)?;

        let state = Arc::new(Mutex::new(session));
        let cancel = CancellationToken::new();
        if let Some(runtime) = runtime {
            runtime.spawn(run_checks(
                self.checker.clone(),
                Arc::clone(&state),
                cancel.clone(),
            ));
        }
        self.sessions.insert(handle, ActiveSession { state, cancel });

        info!(
            migration = name,
            session = %handle,
            total_records,
            background,
            "Monitoring started"
        );
        Ok(handle)
    }

    fn state(&self, handle: SessionHandle) -> Result<SharedSession> {
        self.sessions
            .get(&handle)
            .map(|active| Arc::clone(&active.state))
            .ok_or(MonitorError::UnknownSession(handle))
    }

    /// Record progress. `processed` is the running total and may not go
    /// backwards.
    ///
    /// Reporting an error checks the error rate; reporting a sample checks
    /// recent throughput.
    pub fn update_progress(
        &self,
        handle: SessionHandle,
        processed: u64,
        error: Option<ProgressError>,
        sample: Option<PerformanceSample>,
    ) -> Result<()> {
        let state = self.state(handle)?;
        let config = &self.checker.config;
        let now = self.checker.clock.now();

        let (name, alerts) = {
            let mut session = state.lock();
            if session.status != SessionStatus::Running {
                return Err(MonitorError::UnknownSession(handle));
            }
            if processed < session.processed {
                return Err(MonitorError::ProgressRegressed {
                    previous: session.processed,
                    attempted: processed,
                });
            }
            session.processed = processed;
            session.last_progress_at = now;

            let mut alerts = Vec::new();
            if let Some(error) = error {
                session.errors.push(ErrorRecord {
                    message: error.message,
                    timestamp: now,
                    entity_id: error.entity_id,
                });
                let rate = session.error_rate();
                if session.processed > 0 && rate > config.error_rate_threshold {
                    alerts.push(Alert::new(
                        AlertKind::HighErrorRate,
                        format!(
                            "Error rate {} exceeds {}",
                            format_percent(rate),
                            format_percent(config.error_rate_threshold)
                        ),
                        now,
                    ));
                }
            }
            if let Some(sample) = sample {
                session.push_sample(sample, config.max_samples);
                if let Some(mean) = session.recent_throughput(config.slow_window) {
                    if mean < config.slow_throughput {
                        alerts.push(Alert::new(
                            AlertKind::SlowProcessing,
                            format!("Throughput {mean:.2} rows/s over the last {} batches", config.slow_window),
                            now,
                        ));
                    }
                }
            }
            session.alerts.extend(alerts.iter().cloned());
            self.checker.persist(&session)?;
            (session.name.clone(), alerts)
        };

        self.checker.deliver(&name, &alerts);
        Ok(())
    }

    /// Record a failure without changing the processed count.
    pub fn record_error(&self, handle: SessionHandle, error: ProgressError) -> Result<()> {
        let processed = self.state(handle)?.lock().processed;
        self.update_progress(handle, processed, Some(error), None)
    }

    /// Current view of a session.
    pub fn get_status(&self, handle: SessionHandle) -> Result<StatusSnapshot> {
        let state = self.state(handle)?;
        let now = self.checker.clock.now();
        let session = state.lock();
        Ok(StatusSnapshot {
            name: session.name.clone(),
            status: session.status,
            percent_complete: session.percent_complete(),
            processed: session.processed,
            total_records: session.total_records,
            error_count: session.errors.len(),
            error_rate: session.error_rate(),
            alert_count: session.alerts.len(),
            elapsed: session.elapsed(now),
            eta: session.eta(now),
            latest_sample: session.samples.last().cloned(),
        })
    }

    /// Full copy of a session's state.
    pub fn session(&self, handle: SessionHandle) -> Result<MonitorSession> {
        Ok(self.state(handle)?.lock().clone())
    }

    /// Raise an alert on a session, persist it and deliver it.
    pub fn send_alert(
        &self,
        handle: SessionHandle,
        kind: AlertKind,
        message: impl Into<String>,
    ) -> Result<Alert> {
        let state = self.state(handle)?;
        let alert = Alert::new(kind, message, self.checker.clock.now());
        let name = {
            let mut session = state.lock();
            if session.status != SessionStatus::Running {
                return Err(MonitorError::UnknownSession(handle));
            }
            session.alerts.push(alert.clone());
            self.checker.persist(&session)?;
            session.name.clone()
        };
        self.checker.deliver(&name, std::slice::from_ref(&alert));
        Ok(alert)
    }

    /// Run the background health check once, now.
    pub fn run_health_check(&self, handle: SessionHandle) -> Result<Vec<Alert>> {
        let state = self.state(handle)?;
        self.checker.health_check(&state)
    }

    /// Stop monitoring and produce the session's report.
    ///
    /// Cancels the background check, writes the report file when a reports
    /// directory is configured and removes the session from the store.
    pub fn stop_monitoring(&self, handle: SessionHandle, status: SessionStatus) -> Result<Report> {
        let (_, active) = self
            .sessions
            .remove(&handle)
            .ok_or(MonitorError::UnknownSession(handle))?;
        active.cancel.cancel();

        let now = self.checker.clock.now();
        let report = {
            let mut session = active.state.lock();
            session.status = status;
            if let Err(e) = self.checker.store.remove(&handle.store_key()) {
                warn!(migration = %session.name, error = %e, "Failed to remove persisted session");
            }
            Report::from_session(&session, status, now)
        };

        if let Some(writer) = &self.writer {
            if let Err(e) = writer.write(&report) {
                warn!(migration = %report.name, error = %e, "Failed to write migration report");
            }
        }

        info!(
            migration = %report.name,
            session = %handle,
            status = %status,
            processed = report.processed,
            error_rate = %report.error_rate,
            alerts = report.alert_count,
            "Monitoring stopped"
        );
        Ok(report)
    }

    /// Read a persisted session from the store.
    pub fn persisted(&self, handle: SessionHandle) -> Result<Option<MonitorSession>> {
        self.checker.store.get(&handle.store_key())
    }

    /// Current time according to the monitor's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.checker.clock.now()
    }
}

impl Drop for MigrationMonitor {
    fn drop(&mut self) {
        for active in self.sessions.iter() {
            active.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for MigrationMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationMonitor")
            .field("config", &self.checker.config)
            .field("active_sessions", &self.sessions.len())
            .finish()
    }
}

async fn run_checks(checker: Checker, state: SharedSession, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(checker.config.check_interval);
    ticker.tick().await; // Skip first immediate tick

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = checker.health_check(&state) {
                    warn!(error = %e, "Background health check failed");
                }
                if state.lock().status != SessionStatus::Running {
                    break;
                }
            }
        }
    }
    debug!("Background health check stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{CollectingNotifier, Severity};
    use crate::clock::ManualClock;
    use backstep_core::FixedSampler;

    struct Fixture {
        monitor: MigrationMonitor,
        clock: Arc<ManualClock>,
        sampler: Arc<FixedSampler>,
        critical: Arc<CollectingNotifier>,
        standard: Arc<CollectingNotifier>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::default());
        let sampler = Arc::new(FixedSampler::idle());
        let critical = Arc::new(CollectingNotifier::new());
        let standard = Arc::new(CollectingNotifier::new());
        let monitor = MigrationMonitor::new(MonitorConfig::default())
            .unwrap()
            .with_clock(clock.clone())
            .with_sampler(sampler.clone())
            .with_notifiers(critical.clone(), standard.clone());
        Fixture {
            monitor,
            clock,
            sampler,
            critical,
            standard,
        }
    }

    fn kinds(monitor: &MigrationMonitor, handle: SessionHandle) -> Vec<AlertKind> {
        monitor
            .session(handle)
            .unwrap()
            .alerts
            .into_iter()
            .map(|a| a.kind)
            .collect()
    }

    #[test]
    fn test_start_persists_session() {
        let f = fixture();
        let handle = f.monitor.start_monitoring("backfill", 500, false).unwrap();

        let persisted = f.monitor.persisted(handle).unwrap().unwrap();
        assert_eq!(persisted.name, "backfill");
        assert_eq!(persisted.status, SessionStatus::Running);
        assert_eq!(f.monitor.active_sessions(), 1);
    }

    #[test]
    fn test_background_without_runtime_fails() {
        let f = fixture();
        assert!(matches!(
            f.monitor.start_monitoring("backfill", 10, true),
            Err(MonitorError::NoRuntime)
        ));
        assert_eq!(f.monitor.active_sessions(), 0);
    }

    #[test]
    fn test_progress_must_not_regress() {
        let f = fixture();
        let handle = f.monitor.start_monitoring("backfill", 100, false).unwrap();
        f.monitor.update_progress(handle, 50, None, None).unwrap();
        f.monitor.update_progress(handle, 50, None, None).unwrap();

        match f.monitor.update_progress(handle, 40, None, None) {
            Err(MonitorError::ProgressRegressed { previous, attempted }) => {
                assert_eq!((previous, attempted), (50, 40));
            }
            other => panic!("expected regression error, got {other:?}"),
        }
        assert_eq!(f.monitor.get_status(handle).unwrap().processed, 50);
    }

    #[test]
    fn test_error_rate_threshold_is_exclusive() {
        let f = fixture();
        let handle = f.monitor.start_monitoring("import", 1000, false).unwrap();

        for i in 0..5 {
            f.monitor
                .update_progress(handle, 100, Some(ProgressError::new("bad row").with_entity(i)), None)
                .unwrap();
        }
        assert!(kinds(&f.monitor, handle).is_empty());

        f.monitor
            .update_progress(handle, 100, Some(ProgressError::new("bad row")), None)
            .unwrap();
        assert_eq!(kinds(&f.monitor, handle), vec![AlertKind::HighErrorRate]);
        assert_eq!(f.critical.kinds(), vec![AlertKind::HighErrorRate]);
        assert!(f.standard.kinds().is_empty());
    }

    #[test]
    fn test_slow_processing_needs_five_samples() {
        let f = fixture();
        let handle = f.monitor.start_monitoring("slow", 1000, false).unwrap();
        let slow = || {
            PerformanceSample::measure(1, Duration::from_secs(4), backstep_core::ResourceUsage::default())
        };

        for i in 1..=4 {
            f.monitor.update_progress(handle, i, None, Some(slow())).unwrap();
        }
        assert!(kinds(&f.monitor, handle).is_empty());

        f.monitor.update_progress(handle, 5, None, Some(slow())).unwrap();
        assert_eq!(kinds(&f.monitor, handle), vec![AlertKind::SlowProcessing]);
        assert_eq!(f.standard.kinds(), vec![AlertKind::SlowProcessing]);
    }

    #[test]
    fn test_stall_detected_after_timeout() {
        let f = fixture();
        let handle = f.monitor.start_monitoring("stuck", 100, false).unwrap();

        f.clock.advance(Duration::from_secs(299));
        assert!(f.monitor.run_health_check(handle).unwrap().is_empty());

        f.clock.advance(Duration::from_secs(1));
        let alerts = f.monitor.run_health_check(handle).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Stalled);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(f.critical.kinds(), vec![AlertKind::Stalled]);
    }

    #[test]
    fn test_resource_alerts() {
        let f = fixture();
        let handle = f.monitor.start_monitoring("hot", 100, false).unwrap();
        f.sampler.set(95.0, 85.0);

        let alerts = f.monitor.run_health_check(handle).unwrap();
        let kinds: Vec<_> = alerts.iter().map(|a| a.kind.clone()).collect();
        assert_eq!(kinds, vec![AlertKind::HighCpu, AlertKind::HighMemory]);
        assert!(alerts.iter().all(|a| a.severity == Severity::Warning));
        assert_eq!(f.standard.kinds().len(), 2);
    }

    #[test]
    fn test_status_and_eta() {
        let f = fixture();
        let handle = f.monitor.start_monitoring("eta", 1000, false).unwrap();
        f.clock.advance(Duration::from_secs(10));
        f.monitor.update_progress(handle, 250, None, None).unwrap();

        let status = f.monitor.get_status(handle).unwrap();
        assert_eq!(status.percent_complete, 25.0);
        assert_eq!(status.elapsed, Duration::from_secs(10));
        assert_eq!(status.eta, Some(Duration::from_secs(30)));
        assert!(status.latest_sample.is_none());
    }

    #[test]
    fn test_send_alert_routes_custom_as_info() {
        let f = fixture();
        let handle = f.monitor.start_monitoring("notes", 0, false).unwrap();
        let alert = f
            .monitor
            .send_alert(handle, AlertKind::Custom("checkpoint".into()), "halfway")
            .unwrap();
        assert_eq!(alert.severity, Severity::Info);
        assert_eq!(f.standard.kinds(), vec![AlertKind::Custom("checkpoint".into())]);
    }

    #[test]
    fn test_stop_produces_report_and_forgets_session() {
        let f = fixture();
        let handle = f.monitor.start_monitoring("finish", 1000, false).unwrap();
        f.monitor.update_progress(handle, 1000, None, None).unwrap();
        for _ in 0..10 {
            f.monitor.record_error(handle, ProgressError::new("skipped")).unwrap();
        }

        let report = f.monitor.stop_monitoring(handle, SessionStatus::Completed).unwrap();
        assert_eq!(report.error_rate, "1.0%");
        assert_eq!(report.status, SessionStatus::Completed);
        assert_eq!(report.processed, 1000);

        assert_eq!(f.monitor.active_sessions(), 0);
        assert!(f.monitor.persisted(handle).unwrap().is_none());
        assert!(matches!(
            f.monitor.get_status(handle),
            Err(MonitorError::UnknownSession(_))
        ));
        assert!(matches!(
            f.monitor.stop_monitoring(handle, SessionStatus::Completed),
            Err(MonitorError::UnknownSession(_))
        ));
    }

    #[test]
    fn test_send_alert_is_persisted() {
        let f = fixture();
        let handle = f.monitor.start_monitoring("notes", 0, false).unwrap();
        f.monitor
            .send_alert(handle, AlertKind::Custom("checkpoint".into()), "halfway")
            .unwrap();

        let persisted = f.monitor.persisted(handle).unwrap().unwrap();
        assert_eq!(persisted.alerts.len(), 1);
        assert_eq!(persisted.alerts[0].message, "halfway");
    }

    /// Blocks the first armed `set` until released.
    struct GatedStore {
        inner: MemorySessionStore,
        armed: std::sync::atomic::AtomicBool,
        entered: Mutex<Option<std::sync::mpsc::Sender<()>>>,
        release: Mutex<Option<std::sync::mpsc::Receiver<()>>>,
    }

    impl SessionStore for GatedStore {
        fn get(&self, key: &str) -> Result<Option<MonitorSession>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, session: &MonitorSession, ttl: Duration) -> Result<()> {
            if self.armed.swap(false, std::sync::atomic::Ordering::SeqCst) {
                if let Some(entered) = self.entered.lock().take() {
                    entered.send(()).unwrap();
                }
                if let Some(release) = self.release.lock().take() {
                    release.recv().unwrap();
                }
            }
            self.inner.set(key, session, ttl)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_stop_during_health_check_leaves_no_stale_session() {
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let store = Arc::new(GatedStore {
            inner: MemorySessionStore::new(),
            armed: std::sync::atomic::AtomicBool::new(false),
            entered: Mutex::new(Some(entered_tx)),
            release: Mutex::new(Some(release_rx)),
        });
        let monitor = Arc::new(
            MigrationMonitor::new(MonitorConfig::default())
                .unwrap()
                .with_sampler(Arc::new(FixedSampler::idle()))
                .with_notifiers(
                    Arc::new(CollectingNotifier::new()),
                    Arc::new(CollectingNotifier::new()),
                )
                .with_store(store.clone()),
        );
        let handle = monitor.start_monitoring("race", 10, false).unwrap();
        store.armed.store(true, std::sync::atomic::Ordering::SeqCst);

        let checking = {
            let monitor = Arc::clone(&monitor);
            std::thread::spawn(move || monitor.run_health_check(handle))
        };
        entered_rx.recv().unwrap();

        let stopping = {
            let monitor = Arc::clone(&monitor);
            std::thread::spawn(move || monitor.stop_monitoring(handle, SessionStatus::Completed))
        };
        std::thread::sleep(Duration::from_millis(50));
        release_tx.send(()).unwrap();

        checking.join().unwrap().unwrap();
        let report = stopping.join().unwrap().unwrap();
        assert_eq!(report.status, SessionStatus::Completed);
        assert!(store.inner.get(&handle.store_key()).unwrap().is_none());
    }
}

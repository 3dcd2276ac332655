//! Runs migrations end to end.
//!
//! A run takes the migration's lock, opens a monitoring session, executes
//! `up` inside the reversible engine with the session as progress sink and
//! closes the session with the outcome. The lock is released on every path.

use std::sync::Arc;
use std::time::Duration;

use backstep_core::{
    AdaptiveLoadController, DistributedLock, EngineConfig, ExecutionLogEntry, LoadControlConfig,
    LocalLock, Migration, RelationDef, ResourceSampler, ReversibleEngine, Store, SystemSampler,
};
use backstep_monitor::{MigrationMonitor, MonitorProgress, Report, SessionStatus};
use tracing::{error, info, warn};

use crate::error::RunnerError;

/// Settings for a [`MigrationRunner`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// How long to wait for the migration lock.
    pub lock_timeout: Duration,

    /// Whether sessions get a background health check. Requires a tokio
    /// runtime.
    pub background_monitoring: bool,

    /// Adaptive pacing for engine batches; `None` runs batches at the size
    /// the migration asks for.
    pub load_control: Option<LoadControlConfig>,

    /// Verify integrity before committing.
    pub verify_on_success: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(10),
            background_monitoring: true,
            load_control: Some(LoadControlConfig::default()),
            verify_on_success: true,
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The monitor's report for the run.
    pub report: Report,
    /// The engine's execution record.
    pub execution: Option<ExecutionLogEntry>,
}

/// Executes migrations against one store.
pub struct MigrationRunner<S: Store> {
    store: Arc<S>,
    monitor: Arc<MigrationMonitor>,
    lock: Arc<dyn DistributedLock>,
    sampler: Arc<dyn ResourceSampler>,
    relations: Vec<RelationDef>,
    config: RunnerConfig,
}

impl<S: Store> MigrationRunner<S> {
    /// Create a runner with an in-process lock and the system sampler.
    pub fn new(store: Arc<S>, monitor: Arc<MigrationMonitor>) -> Self {
        Self {
            store,
            monitor,
            lock: Arc::new(LocalLock::new()),
            sampler: Arc::new(SystemSampler::new()),
            relations: Vec::new(),
            config: RunnerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Serialize runs through `lock`.
    pub fn with_lock(mut self, lock: Arc<dyn DistributedLock>) -> Self {
        self.lock = lock;
        self
    }

    /// Feed the load controller from `sampler`.
    pub fn with_sampler(mut self, sampler: Arc<dyn ResourceSampler>) -> Self {
        self.sampler = sampler;
        self
    }

    /// Register a relation on every engine this runner builds.
    pub fn with_relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn with_background_monitoring(mut self, enabled: bool) -> Self {
        self.config.background_monitoring = enabled;
        self
    }

    pub fn with_load_control(mut self, config: Option<LoadControlConfig>) -> Self {
        self.config.load_control = config;
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn monitor(&self) -> &Arc<MigrationMonitor> {
        &self.monitor
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Build the engine a run of `name` would use.
    pub fn engine(&self, name: &str) -> Result<ReversibleEngine<S>, RunnerError> {
        let config =
            EngineConfig::new(name).with_verify_on_success(self.config.verify_on_success);
        let mut engine = ReversibleEngine::new(Arc::clone(&self.store), config);
        for relation in &self.relations {
            engine = engine.with_relation(relation.clone());
        }
        if let Some(load) = &self.config.load_control {
            let controller = AdaptiveLoadController::new(load.clone(), Arc::clone(&self.sampler))
                .map_err(|e| RunnerError::Engine {
                    source: e.into(),
                    report: None,
                })?;
            engine = engine.with_pacer(controller);
        }
        Ok(engine)
    }

    /// Run `migration` on a freshly built engine.
    pub fn run(&self, migration: &dyn Migration<S>) -> Result<RunOutcome, RunnerError> {
        let engine = self.engine(migration.name())?;
        self.run_with(migration, engine)
    }

    /// Run `migration` on a caller-configured engine.
    pub fn run_with(
        &self,
        migration: &dyn Migration<S>,
        mut engine: ReversibleEngine<S>,
    ) -> Result<RunOutcome, RunnerError> {
        let key = format!("migration:{}", migration.name());
        if !self.lock.acquire(&key, self.config.lock_timeout) {
            warn!(migration = migration.name(), lock = %key, "Migration lock unavailable");
            return Err(RunnerError::LockUnavailable(key));
        }

        let result = self.execute(migration, &mut engine);
        self.lock.release(&key);
        result
    }

    fn execute(
        &self,
        migration: &dyn Migration<S>,
        engine: &mut ReversibleEngine<S>,
    ) -> Result<RunOutcome, RunnerError> {
        let name = migration.name();
        let total = migration.expected_records(&**engine.store())?;
        let handle = self
            .monitor
            .start_monitoring(name, total, self.config.background_monitoring)?;

        engine.set_progress(Some(Arc::new(MonitorProgress::new(
            Arc::clone(&self.monitor),
            handle,
        ))));
        let result = engine.run(|e| migration.up(e));
        engine.set_progress(None);
        let execution = engine.take_execution();

        let status = if result.is_ok() {
            SessionStatus::Completed
        } else {
            SessionStatus::Failed
        };
        let report = self.monitor.stop_monitoring(handle, status);

        match (result, report) {
            (Ok(()), Ok(report)) => {
                info!(
                    migration = name,
                    processed = report.processed,
                    duration_secs = report.duration,
                    "Migration completed"
                );
                Ok(RunOutcome { report, execution })
            }
            (Ok(()), Err(e)) => Err(e.into()),
            (Err(source), report) => {
                let report = match report {
                    Ok(report) => Some(Box::new(report)),
                    Err(e) => {
                        warn!(migration = name, error = %e, "No report for failed migration");
                        None
                    }
                };
                error!(migration = name, error = %source, "Migration failed");
                Err(RunnerError::Engine { source, report })
            }
        }
    }
}

impl<S: Store> std::fmt::Debug for MigrationRunner<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationRunner")
            .field("config", &self.config)
            .field("relations", &self.relations)
            .finish_non_exhaustive()
    }
}

//! Backstep - reversible, adaptively paced bulk data migrations.
//!
//! A migration implements [`Migration`] and expresses its whole
//! transformation through the [`ReversibleEngine`] primitives. The
//! [`MigrationRunner`] serializes runs behind a named lock, follows each run
//! with a [`MigrationMonitor`] and returns its report. If anything fails, the
//! engine undoes every batch and the dataset is left as it was.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use backstep::{
//!     attributes, EngineError, Migration, MigrationMonitor, MigrationRunner, MonitorConfig,
//!     ReversibleEngine, StorageEngine,
//! };
//!
//! struct SeedRegions;
//!
//! impl Migration<StorageEngine> for SeedRegions {
//!     fn name(&self) -> &str {
//!         "seed_regions"
//!     }
//!
//!     fn up(&self, engine: &mut ReversibleEngine<StorageEngine>) -> Result<(), EngineError> {
//!         let regions = ["north", "south"]
//!             .into_iter()
//!             .map(|name| attributes! { "name" => name })
//!             .collect();
//!         engine.create("Region", regions, 1000, None)?;
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! backstep::telemetry::init()?;
//! let store = Arc::new(StorageEngine::temporary()?);
//! let monitor = Arc::new(MigrationMonitor::new(MonitorConfig::default())?);
//! let runner = MigrationRunner::new(store, monitor).with_background_monitoring(false);
//! let outcome = runner.run(&SeedRegions)?;
//! println!("processed {} rows", outcome.report.processed);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod runner;
pub mod telemetry;

pub use error::RunnerError;
pub use runner::{MigrationRunner, RunOutcome, RunnerConfig};

pub use backstep_core::{
    attributes, AdaptiveLoadController, Attributes, BackoffStrategy, Cardinality,
    DistributedLock, EngineConfig, EngineError, EngineState, ExecutionLogEntry, ExecutionStatus,
    FixedPacer, IntegrityCheck, LoadControlConfig, LocalLock, Migration, RecordId, RelationDef,
    ResourceSampler, RetryPolicy, RetryableError, ReversibleEngine, Selector, StorageConfig,
    StorageEngine, Store, SystemSampler, Value,
};
pub use backstep_monitor::{
    Alert, AlertKind, MigrationMonitor, MonitorConfig, MonitorProgress, Notifier, Report,
    SessionStatus, Severity,
};

pub use backstep_core;
pub use backstep_monitor;

//! Backstep Core - reversible engine, record store and adaptive load control.
//!
//! This crate provides the execution side of Backstep: a sled-backed record
//! store with savepoints, the reversible engine that makes a bulk migration
//! undoable as a unit, and the controller that paces its batches.

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod engine;
pub mod error;
pub mod load;
pub mod lock;
pub mod migration;
pub mod relation;
pub mod selector;
pub mod sleep;
pub mod storage;
pub mod value;

pub use engine::{
    BackoffStrategy, EngineConfig, EngineError, EngineState, ExecutionLogEntry, ExecutionStatus,
    IntegrityCheck, ProgressSink, RetryPolicy, RetryableError, ReversibleEngine, RollbackEntry,
    RollbackFailure, RollbackLog, RollbackPayload,
};
pub use error::{ConfigError, Error};
pub use load::{
    AdaptiveLoadController, BatchPacer, FixedPacer, FixedSampler, LoadControlConfig,
    PerformanceSample, ResourceSampler, ResourceUsage, SystemSampler,
};
pub use lock::{DistributedLock, LocalLock};
pub use migration::Migration;
pub use relation::{Cardinality, RelationDef};
pub use selector::Selector;
pub use sleep::{RecordingSleeper, Sleeper, ThreadSleeper};
pub use storage::{Savepoint, StorageConfig, StorageEngine, Store};
pub use value::{Attributes, RecordId, Value};

//! Reversible execution of bulk mutations.
//!
//! The [`ReversibleEngine`] runs a migration body inside a savepoint and
//! offers batched `create`, `update` and `delete` primitives whose undo
//! information is kept in a [`RollbackLog`].

mod config;
mod error;
mod integrity;
mod progress;
mod retry;
mod reversible;
mod rollback;
mod state;

pub use config::EngineConfig;
pub use error::{EngineError, RetryableError, RollbackFailure};
pub use integrity::{verify_relation, IntegrityCheck};
pub use progress::ProgressSink;
pub use retry::{BackoffStrategy, RetryPolicy};
pub use reversible::ReversibleEngine;
pub use rollback::{PriorAttributes, RelatedSnapshot, RollbackEntry, RollbackLog, RollbackPayload};
pub use state::{EngineState, ExecutionLogEntry, ExecutionStatus};

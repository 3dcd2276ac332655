//! Progress reporting from the engine to an observer.

use crate::load::PerformanceSample;
use crate::value::RecordId;

/// Receives batch progress and partial failures while a run executes.
///
/// Implementations must not fail the run; they report their own problems
/// through logging.
pub trait ProgressSink: Send + Sync {
    /// A batch of `rows` finished. `sample` is the pacer's measurement for
    /// it, if any.
    fn on_batch(&self, rows: u64, sample: Option<&PerformanceSample>);

    /// The body reported a failure that does not abort the run.
    fn on_error(&self, message: &str, entity_id: Option<RecordId>);
}

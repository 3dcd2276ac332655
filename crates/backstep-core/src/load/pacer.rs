//! The per-batch sizing and pausing seam used by the engine.

use std::time::Duration;

use super::sample::PerformanceSample;

/// What a pacer observed about a finished batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchFeedback {
    /// Sample recorded for the batch, if the pacer samples at all.
    pub sample: Option<PerformanceSample>,
    /// The store should release cached memory before the next batch.
    pub reclaim: bool,
}

/// Decides how large each batch is and how long to pause between batches.
///
/// The engine calls [`batch_size`](Self::batch_size) before each batch,
/// [`after_batch`](Self::after_batch) as soon as the batch has been written,
/// and [`pause`](Self::pause) once any reclaim has been carried out.
pub trait BatchPacer: Send {
    /// Size of the next batch given the size the caller asked for.
    fn batch_size(&self, requested: usize) -> usize;

    /// Observe a finished batch.
    fn after_batch(&mut self, rows: usize, elapsed: Duration) -> BatchFeedback;

    /// Wait before the next batch.
    fn pause(&mut self) {}
}

/// Uses the caller's batch size and never pauses.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedPacer;

impl BatchPacer for FixedPacer {
    fn batch_size(&self, requested: usize) -> usize {
        requested
    }

    fn after_batch(&mut self, _rows: usize, _elapsed: Duration) -> BatchFeedback {
        BatchFeedback::default()
    }
}

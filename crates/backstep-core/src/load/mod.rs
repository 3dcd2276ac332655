//! Adaptive load control.
//!
//! Sizes batches and paces the gaps between them from measured batch
//! latency and the process's CPU and memory usage.

mod config;
mod controller;
mod pacer;
mod sample;
mod sampler;

pub use config::LoadControlConfig;
pub use controller::{Adjustment, AdaptiveLoadController, Pressure};
pub use pacer::{BatchFeedback, BatchPacer, FixedPacer};
pub use sample::{PerformanceSample, SampleWindow};
pub use sampler::{FixedSampler, ResourceSampler, ResourceUsage, SystemSampler};

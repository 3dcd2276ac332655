//! Per-batch performance samples.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sampler::ResourceUsage;

/// Measurements taken right after one batch completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    /// Rows in the batch.
    pub batch_size: usize,
    /// Wall-clock duration of the batch in seconds.
    pub execution_time: f64,
    /// Rows per second.
    pub throughput: f64,
    /// Process CPU usage in percent.
    pub cpu_percent: f64,
    /// Process memory usage in percent.
    pub memory_percent: f64,
    /// When the sample was taken.
    pub timestamp: DateTime<Utc>,
}

impl PerformanceSample {
    /// Build a sample from a measured batch.
    pub fn measure(batch_size: usize, elapsed: Duration, usage: ResourceUsage) -> Self {
        let secs = elapsed.as_secs_f64();
        let throughput = if secs > 0.0 {
            batch_size as f64 / secs
        } else {
            batch_size as f64
        };
        Self {
            batch_size,
            execution_time: secs,
            throughput,
            cpu_percent: usage.cpu_percent,
            memory_percent: usage.memory_percent,
            timestamp: Utc::now(),
        }
    }
}

/// Bounded FIFO of recent samples.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<PerformanceSample>,
    capacity: usize,
}

impl SampleWindow {
    /// Create an empty window holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest when full.
    pub fn push(&mut self, sample: PerformanceSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<&PerformanceSample> {
        self.samples.back()
    }

    /// Samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &PerformanceSample> {
        self.samples.iter()
    }

    /// Mean throughput of the last `n` samples, `None` when empty.
    pub fn mean_throughput(&self, n: usize) -> Option<f64> {
        let take = n.min(self.samples.len());
        if take == 0 {
            return None;
        }
        let sum: f64 = self.samples.iter().rev().take(take).map(|s| s.throughput).sum();
        Some(sum / take as f64)
    }

    /// Drop all samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

//! Adaptive load controller.
//!
//! After every batch the controller records a [`PerformanceSample`] and makes
//! at most one adjustment: shrink the next batch and lengthen the pause when
//! the batch was slow or the process is under CPU or memory pressure, grow
//! the batch and shorten the pause when the batch was fast, otherwise hold.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::config::LoadControlConfig;
use super::pacer::{BatchFeedback, BatchPacer};
use super::sample::{PerformanceSample, SampleWindow};
use super::sampler::{ResourceSampler, ResourceUsage};
use crate::error::ConfigError;
use crate::sleep::{Sleeper, ThreadSleeper};

/// Why the controller backed off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pressure {
    /// The batch took longer than the query time threshold.
    SlowBatch,
    /// CPU usage exceeded its threshold.
    Cpu,
    /// Memory usage exceeded its threshold.
    Memory,
}

/// The single adjustment made after a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    Hold,
    Grow,
    Shrink(Pressure),
}

/// Batch pacer that adapts to batch latency and process resource usage.
pub struct AdaptiveLoadController {
    config: LoadControlConfig,
    batch_size: usize,
    sleep: Duration,
    window: SampleWindow,
    sampler: Arc<dyn ResourceSampler>,
    sleeper: Arc<dyn Sleeper>,
}

impl AdaptiveLoadController {
    /// Create a controller, rejecting incoherent configuration.
    pub fn new(
        config: LoadControlConfig,
        sampler: Arc<dyn ResourceSampler>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            batch_size: config.initial_batch_size,
            sleep: config.initial_sleep,
            window: SampleWindow::new(config.sample_window),
            sampler,
            sleeper: Arc::new(ThreadSleeper),
            config,
        })
    }

    /// Pause through `sleeper` instead of the current thread.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &LoadControlConfig {
        &self.config
    }

    /// Size the next batch will have.
    pub fn current_batch_size(&self) -> usize {
        self.batch_size
    }

    /// Pause that follows the next batch.
    pub fn current_sleep(&self) -> Duration {
        self.sleep
    }

    /// Retained samples.
    pub fn samples(&self) -> &SampleWindow {
        &self.window
    }

    /// Record a batch and adjust size and pause.
    ///
    /// `rows` is the number of rows the batch actually processed and
    /// `usage` the resource reading taken right after it.
    pub fn observe(&mut self, rows: usize, elapsed: Duration, usage: ResourceUsage) -> Adjustment {
        self.window
            .push(PerformanceSample::measure(rows, elapsed, usage));

        let threshold = self.config.query_time_threshold;
        let latency = if elapsed > threshold {
            Some(Pressure::SlowBatch)
        } else {
            None
        };

        let pressure = if usage.memory_percent > self.config.memory_threshold {
            Some(Pressure::Memory)
        } else if usage.cpu_percent > self.config.cpu_threshold {
            Some(Pressure::Cpu)
        } else {
            latency
        };

        let adjustment = match pressure {
            Some(reason) => Adjustment::Shrink(reason),
            None if elapsed < threshold / 2 => Adjustment::Grow,
            None => Adjustment::Hold,
        };

        match adjustment {
            Adjustment::Shrink(reason) => self.shrink(reason, elapsed, usage),
            Adjustment::Grow => self.grow(),
            Adjustment::Hold => {}
        }
        adjustment
    }

    fn shrink(&mut self, reason: Pressure, elapsed: Duration, usage: ResourceUsage) {
        let factor = 1.0 - self.config.adjustment_factor;
        let scaled = (self.batch_size as f64 * factor).round() as usize;
        // Always at least one row smaller until the floor.
        self.batch_size = scaled
            .min(self.batch_size.saturating_sub(1))
            .max(self.config.min_batch_size);
        self.sleep = (self.sleep + self.config.sleep_step).min(self.config.max_sleep);

        warn!(
            ?reason,
            elapsed_ms = elapsed.as_millis() as u64,
            cpu_percent = usage.cpu_percent,
            memory_percent = usage.memory_percent,
            batch_size = self.batch_size,
            sleep_ms = self.sleep.as_millis() as u64,
            "Throttling migration"
        );
    }

    fn grow(&mut self) {
        let factor = 1.0 + self.config.adjustment_factor;
        let scaled = (self.batch_size as f64 * factor).round() as usize;
        self.batch_size = scaled
            .max(self.batch_size + 1)
            .min(self.config.max_batch_size);
        self.sleep = self
            .sleep
            .saturating_sub(self.config.sleep_step)
            .max(self.config.min_sleep);

        debug!(
            batch_size = self.batch_size,
            sleep_ms = self.sleep.as_millis() as u64,
            "Increasing migration pace"
        );
    }
}

impl BatchPacer for AdaptiveLoadController {
    /// The adaptive size replaces whatever the caller asked for.
    fn batch_size(&self, _requested: usize) -> usize {
        self.batch_size
    }

    fn after_batch(&mut self, rows: usize, elapsed: Duration) -> BatchFeedback {
        let usage = self.sampler.sample();
        let adjustment = self.observe(rows, elapsed, usage);
        BatchFeedback {
            sample: self.window.latest().cloned(),
            reclaim: adjustment == Adjustment::Shrink(Pressure::Memory),
        }
    }

    fn pause(&mut self) {
        self.sleeper.sleep(self.sleep);
    }
}

impl std::fmt::Debug for AdaptiveLoadController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveLoadController")
            .field("batch_size", &self.batch_size)
            .field("sleep", &self.sleep)
            .field("samples", &self.window.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::sampler::FixedSampler;
    use crate::sleep::RecordingSleeper;

    fn controller(config: LoadControlConfig) -> AdaptiveLoadController {
        AdaptiveLoadController::new(config, Arc::new(FixedSampler::idle())).unwrap()
    }

    fn idle() -> ResourceUsage {
        ResourceUsage::default()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = LoadControlConfig::default().with_adjustment_factor(1.5);
        assert!(AdaptiveLoadController::new(config, Arc::new(FixedSampler::idle())).is_err());
    }

    #[test]
    fn test_slow_batches_shrink_and_throttle() {
        let mut ctl = controller(LoadControlConfig::default());

        let mut sizes = vec![ctl.current_batch_size()];
        let mut sleeps = vec![ctl.current_sleep()];
        for secs in [6.0, 7.0, 6.5] {
            let elapsed = Duration::from_secs_f64(secs);
            let adj = ctl.observe(ctl.current_batch_size(), elapsed, idle());
            assert_eq!(adj, Adjustment::Shrink(Pressure::SlowBatch));
            sizes.push(ctl.current_batch_size());
            sleeps.push(ctl.current_sleep());
        }

        assert_eq!(sizes, vec![1000, 800, 640, 512]);
        assert!(sleeps.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(sleeps[1], Duration::from_millis(200));
    }

    #[test]
    fn test_fast_batches_grow_to_cap() {
        let mut ctl = controller(LoadControlConfig::default());
        for _ in 0..50 {
            ctl.observe(ctl.current_batch_size(), Duration::from_millis(10), idle());
        }
        assert_eq!(ctl.current_batch_size(), 10_000);
        assert_eq!(ctl.current_sleep(), Duration::ZERO);
    }

    #[test]
    fn test_shrink_floors_at_min() {
        let mut ctl = controller(LoadControlConfig::default());
        for _ in 0..100 {
            ctl.observe(ctl.current_batch_size(), Duration::from_secs(30), idle());
        }
        assert_eq!(ctl.current_batch_size(), 100);
        assert_eq!(ctl.current_sleep(), Duration::from_secs(10));
    }

    #[test]
    fn test_small_batches_step_by_at_least_one_row() {
        let config = LoadControlConfig::default().with_batch_sizes(1, 2, 100);
        let mut ctl = controller(config);
        for _ in 0..20 {
            ctl.observe(ctl.current_batch_size(), Duration::from_millis(10), idle());
        }
        assert!(ctl.current_batch_size() > 2);

        let mut ctl = controller(LoadControlConfig::default().with_batch_sizes(1, 3, 100));
        let mut sizes = vec![ctl.current_batch_size()];
        for _ in 0..3 {
            ctl.observe(ctl.current_batch_size(), Duration::from_secs(6), idle());
            sizes.push(ctl.current_batch_size());
        }
        assert_eq!(sizes, vec![3, 2, 1, 1]);
    }

    #[test]
    fn test_mid_range_latency_holds() {
        let mut ctl = controller(LoadControlConfig::default());
        let adj = ctl.observe(1000, Duration::from_secs(3), idle());
        assert_eq!(adj, Adjustment::Hold);
        assert_eq!(ctl.current_batch_size(), 1000);
        assert_eq!(ctl.current_sleep(), Duration::from_millis(100));
    }

    #[test]
    fn test_cpu_pressure_overrides_grow() {
        let mut ctl = controller(LoadControlConfig::default());
        let busy = ResourceUsage {
            cpu_percent: 95.0,
            memory_percent: 10.0,
        };
        let adj = ctl.observe(1000, Duration::from_millis(10), busy);
        assert_eq!(adj, Adjustment::Shrink(Pressure::Cpu));
        assert_eq!(ctl.current_batch_size(), 800);
    }

    #[test]
    fn test_pressure_never_shrinks_twice() {
        let mut ctl = controller(LoadControlConfig::default());
        let busy = ResourceUsage {
            cpu_percent: 95.0,
            memory_percent: 95.0,
        };
        ctl.observe(1000, Duration::from_secs(10), busy);
        assert_eq!(ctl.current_batch_size(), 800);
        assert_eq!(ctl.current_sleep(), Duration::from_millis(200));
    }

    #[test]
    fn test_memory_pressure_requests_reclaim() {
        let sampler = Arc::new(FixedSampler::new(0.0, 90.0));
        let sleeper = Arc::new(RecordingSleeper::new());
        let mut ctl = AdaptiveLoadController::new(LoadControlConfig::default(), sampler.clone())
            .unwrap()
            .with_sleeper(sleeper.clone());

        let feedback = ctl.after_batch(1000, Duration::from_millis(10));
        assert!(feedback.reclaim);
        let sample = feedback.sample.unwrap();
        assert_eq!(sample.batch_size, 1000);
        assert_eq!(sample.memory_percent, 90.0);

        ctl.pause();
        assert_eq!(sleeper.pauses(), vec![Duration::from_millis(200)]);

        sampler.set(0.0, 10.0);
        let feedback = ctl.after_batch(800, Duration::from_millis(10));
        assert!(!feedback.reclaim);
    }

    #[test]
    fn test_sample_window_bounded() {
        let mut ctl = controller(LoadControlConfig::default().with_sample_window(5));
        for _ in 0..12 {
            ctl.after_batch(100, Duration::from_secs(3));
        }
        assert_eq!(ctl.samples().len(), 5);
    }

    #[test]
    fn test_adaptive_size_replaces_requested() {
        let ctl = controller(LoadControlConfig::default());
        assert_eq!(ctl.batch_size(50), 1000);
    }
}

//! Load control configuration.

use std::time::Duration;

use crate::error::ConfigError;

/// Tuning for the adaptive load controller.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadControlConfig {
    /// Batch size used for the first batch.
    pub initial_batch_size: usize,

    /// Smallest batch size the controller will shrink to.
    pub min_batch_size: usize,

    /// Largest batch size the controller will grow to.
    pub max_batch_size: usize,

    /// Pause after the first batch.
    pub initial_sleep: Duration,

    /// Shortest pause between batches.
    pub min_sleep: Duration,

    /// Longest pause between batches.
    pub max_sleep: Duration,

    /// Amount the pause moves by on each adjustment.
    pub sleep_step: Duration,

    /// CPU usage (percent) above which the controller throttles.
    pub cpu_threshold: f64,

    /// Memory usage (percent) above which the controller throttles.
    pub memory_threshold: f64,

    /// Batch duration above which the controller shrinks batches.
    pub query_time_threshold: Duration,

    /// Relative change applied to the batch size, in (0, 1).
    pub adjustment_factor: f64,

    /// Number of performance samples retained.
    pub sample_window: usize,
}

impl Default for LoadControlConfig {
    fn default() -> Self {
        Self {
            initial_batch_size: 1000,
            min_batch_size: 100,
            max_batch_size: 10_000,
            initial_sleep: Duration::from_millis(100),
            min_sleep: Duration::ZERO,
            max_sleep: Duration::from_secs(10),
            sleep_step: Duration::from_millis(100),
            cpu_threshold: 70.0,
            memory_threshold: 80.0,
            query_time_threshold: Duration::from_secs(5),
            adjustment_factor: 0.2,
            sample_window: 100,
        }
    }
}

impl LoadControlConfig {
    /// Set batch size bounds and starting point.
    pub fn with_batch_sizes(mut self, min: usize, initial: usize, max: usize) -> Self {
        self.min_batch_size = min;
        self.initial_batch_size = initial;
        self.max_batch_size = max;
        self
    }

    /// Set sleep bounds and starting point.
    pub fn with_sleeps(mut self, min: Duration, initial: Duration, max: Duration) -> Self {
        self.min_sleep = min;
        self.initial_sleep = initial;
        self.max_sleep = max;
        self
    }

    /// Set the sleep adjustment step.
    pub fn with_sleep_step(mut self, step: Duration) -> Self {
        self.sleep_step = step;
        self
    }

    /// Set the CPU threshold in percent.
    pub fn with_cpu_threshold(mut self, percent: f64) -> Self {
        self.cpu_threshold = percent;
        self
    }

    /// Set the memory threshold in percent.
    pub fn with_memory_threshold(mut self, percent: f64) -> Self {
        self.memory_threshold = percent;
        self
    }

    /// Set the batch duration threshold.
    pub fn with_query_time_threshold(mut self, threshold: Duration) -> Self {
        self.query_time_threshold = threshold;
        self
    }

    /// Set the adjustment factor.
    pub fn with_adjustment_factor(mut self, factor: f64) -> Self {
        self.adjustment_factor = factor;
        self
    }

    /// Set the number of retained samples.
    pub fn with_sample_window(mut self, samples: usize) -> Self {
        self.sample_window = samples;
        self
    }

    /// Check that every bound and threshold is coherent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_batch_size == 0 {
            return Err(ConfigError::OutOfRange {
                name: "min_batch_size",
                value: 0.0,
                range: "[1, max_batch_size]",
            });
        }
        if self.min_batch_size > self.max_batch_size {
            return Err(ConfigError::InvertedBounds {
                name: "batch_size",
                min: self.min_batch_size as f64,
                max: self.max_batch_size as f64,
            });
        }
        if !(self.min_batch_size..=self.max_batch_size).contains(&self.initial_batch_size) {
            return Err(ConfigError::OutOfRange {
                name: "initial_batch_size",
                value: self.initial_batch_size as f64,
                range: "[min_batch_size, max_batch_size]",
            });
        }
        if self.min_sleep > self.max_sleep {
            return Err(ConfigError::InvertedBounds {
                name: "sleep",
                min: self.min_sleep.as_secs_f64(),
                max: self.max_sleep.as_secs_f64(),
            });
        }
        if self.initial_sleep < self.min_sleep || self.initial_sleep > self.max_sleep {
            return Err(ConfigError::OutOfRange {
                name: "initial_sleep",
                value: self.initial_sleep.as_secs_f64(),
                range: "[min_sleep, max_sleep]",
            });
        }
        if !(self.adjustment_factor > 0.0 && self.adjustment_factor < 1.0) {
            return Err(ConfigError::OutOfRange {
                name: "adjustment_factor",
                value: self.adjustment_factor,
                range: "(0, 1)",
            });
        }
        check_percent("cpu_threshold", self.cpu_threshold)?;
        check_percent("memory_threshold", self.memory_threshold)?;
        if self.query_time_threshold.is_zero() {
            return Err(ConfigError::OutOfRange {
                name: "query_time_threshold",
                value: 0.0,
                range: "> 0s",
            });
        }
        if self.sample_window == 0 {
            return Err(ConfigError::OutOfRange {
                name: "sample_window",
                value: 0.0,
                range: ">= 1",
            });
        }
        Ok(())
    }
}

fn check_percent(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 100.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            range: "(0, 100]",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = LoadControlConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.initial_batch_size, 1000);
        assert_eq!(config.initial_sleep, Duration::from_millis(100));
        assert_eq!(config.query_time_threshold, Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_inverted_batch_bounds() {
        let config = LoadControlConfig::default().with_batch_sizes(500, 400, 300);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedBounds { name: "batch_size", .. })
        ));
    }

    #[test]
    fn test_rejects_initial_outside_bounds() {
        let config = LoadControlConfig::default().with_batch_sizes(100, 50_000, 10_000);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { name: "initial_batch_size", .. })
        ));

        let config = LoadControlConfig::default().with_sleeps(
            Duration::from_secs(1),
            Duration::ZERO,
            Duration::from_secs(2),
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { name: "initial_sleep", .. })
        ));
    }

    #[test]
    fn test_rejects_bad_factor_and_thresholds() {
        for factor in [0.0, 1.0, -0.5, f64::NAN] {
            let config = LoadControlConfig::default().with_adjustment_factor(factor);
            assert!(config.validate().is_err(), "factor {factor}");
        }
        assert!(LoadControlConfig::default()
            .with_cpu_threshold(0.0)
            .validate()
            .is_err());
        assert!(LoadControlConfig::default()
            .with_memory_threshold(101.0)
            .validate()
            .is_err());
        assert!(LoadControlConfig::default()
            .with_cpu_threshold(100.0)
            .validate()
            .is_ok());
    }
}

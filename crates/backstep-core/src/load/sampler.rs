//! Process resource sampling.

use parking_lot::Mutex;
use sysinfo::{Pid, System};

/// CPU and memory usage of the current process, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResourceUsage {
    /// CPU usage, 0..=100 across all cores.
    pub cpu_percent: f64,
    /// Resident memory as a share of total system memory, 0..=100.
    pub memory_percent: f64,
}

/// Reads the current process's resource usage on demand.
pub trait ResourceSampler: Send + Sync {
    /// Current CPU usage in percent (0..=100).
    fn cpu_percent(&self) -> f64;

    /// Current memory usage in percent (0..=100).
    fn memory_percent(&self) -> f64;

    /// Sample both figures.
    fn sample(&self) -> ResourceUsage {
        ResourceUsage {
            cpu_percent: self.cpu_percent(),
            memory_percent: self.memory_percent(),
        }
    }
}

/// Samples the current process through `sysinfo`.
///
/// CPU usage is measured between consecutive refreshes, so the first reading
/// after construction is 0.
pub struct SystemSampler {
    system: Mutex<System>,
    pid: Pid,
    cores: f64,
}

impl SystemSampler {
    /// Create a sampler for the current process.
    pub fn new() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1) as f64;
        Self {
            system: Mutex::new(System::new()),
            pid: Pid::from(std::process::id() as usize),
            cores,
        }
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSampler for SystemSampler {
    fn cpu_percent(&self) -> f64 {
        let mut system = self.system.lock();
        if !system.refresh_process(self.pid) {
            return 0.0;
        }
        system
            .process(self.pid)
            .map(|p| clamp_percent(p.cpu_usage() as f64 / self.cores))
            .unwrap_or(0.0)
    }

    fn memory_percent(&self) -> f64 {
        let mut system = self.system.lock();
        system.refresh_memory();
        let total = system.total_memory();
        if total == 0 || !system.refresh_process(self.pid) {
            return 0.0;
        }
        system
            .process(self.pid)
            .map(|p| clamp_percent(p.memory() as f64 / total as f64 * 100.0))
            .unwrap_or(0.0)
    }
}

/// Reports fixed, adjustable figures. Useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct FixedSampler {
    usage: Mutex<ResourceUsage>,
}

impl FixedSampler {
    /// Create a sampler that reports the given figures.
    pub fn new(cpu_percent: f64, memory_percent: f64) -> Self {
        Self {
            usage: Mutex::new(ResourceUsage {
                cpu_percent,
                memory_percent,
            }),
        }
    }

    /// A sampler that reports an idle process.
    pub fn idle() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Change the reported figures.
    pub fn set(&self, cpu_percent: f64, memory_percent: f64) {
        *self.usage.lock() = ResourceUsage {
            cpu_percent,
            memory_percent,
        };
    }
}

impl ResourceSampler for FixedSampler {
    fn cpu_percent(&self) -> f64 {
        self.usage.lock().cpu_percent
    }

    fn memory_percent(&self) -> f64 {
        self.usage.lock().memory_percent
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_sampler_in_range() {
        let sampler = SystemSampler::new();
        let usage = sampler.sample();
        assert!((0.0..=100.0).contains(&usage.cpu_percent));
        assert!((0.0..=100.0).contains(&usage.memory_percent));
    }

    #[test]
    fn test_fixed_sampler_set() {
        let sampler = FixedSampler::idle();
        assert_eq!(sampler.sample(), ResourceUsage::default());

        sampler.set(75.0, 20.0);
        assert_eq!(sampler.cpu_percent(), 75.0);
        assert_eq!(sampler.memory_percent(), 20.0);
    }

    #[test]
    fn test_clamp_percent() {
        assert_eq!(clamp_percent(250.0), 100.0);
        assert_eq!(clamp_percent(-1.0), 0.0);
        assert_eq!(clamp_percent(f64::NAN), 0.0);
    }
}

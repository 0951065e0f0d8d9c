//! Available-memory probing and the per-batch sizing policy built on it.

use serde::Deserialize;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Source of the current available-memory reading.
pub trait MemoryProbe: Send + Sync {
    fn available_mb(&self) -> u64;
}

/// Reads available system memory through `sysinfo`.
#[derive(Debug, Default)]
pub struct SysinfoProbe;

impl MemoryProbe for SysinfoProbe {
    fn available_mb(&self) -> u64 {
        let mut system = sysinfo::System::new();
        system.refresh_memory();
        system.available_memory() / BYTES_PER_MB
    }
}

/// A probe that always reports the same value.
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub u64);

impl MemoryProbe for FixedProbe {
    fn available_mb(&self) -> u64 {
        self.0
    }
}

fn default_low_memory_mb() -> u64 {
    2048
}

fn default_high_memory_mb() -> u64 {
    8192
}

fn default_critical_memory_mb() -> u64 {
    1024
}

fn default_max_workers() -> usize {
    std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get)
}

fn default_batch_multiplier() -> usize {
    4
}

fn default_pause_secs() -> u64 {
    5
}

fn default_max_pauses() -> u32 {
    12
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemoryPolicy {
    /// Below this, run one document at a time.
    #[serde(default = "default_low_memory_mb")]
    pub low_memory_mb: u64,
    /// Above this, use every worker.
    #[serde(default = "default_high_memory_mb")]
    pub high_memory_mb: u64,
    /// After a batch, pause while available memory stays below this.
    #[serde(default = "default_critical_memory_mb")]
    pub critical_memory_mb: u64,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Batch size is `workers * batch_multiplier` at full capacity.
    #[serde(default = "default_batch_multiplier")]
    pub batch_multiplier: usize,
    #[serde(default = "default_pause_secs")]
    pub pause_secs: u64,
    /// Pauses per batch before giving up and continuing anyway.
    #[serde(default = "default_max_pauses")]
    pub max_pauses: u32,
}

impl Default for MemoryPolicy {
    fn default() -> Self {
        Self {
            low_memory_mb: default_low_memory_mb(),
            high_memory_mb: default_high_memory_mb(),
            critical_memory_mb: default_critical_memory_mb(),
            max_workers: default_max_workers(),
            batch_multiplier: default_batch_multiplier(),
            pause_secs: default_pause_secs(),
            max_pauses: default_max_pauses(),
        }
    }
}

/// Worker count and batch size, fixed for the duration of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    pub workers: usize,
    pub batch_size: usize,
}

impl MemoryPolicy {
    #[must_use]
    pub fn plan(&self, available_mb: u64) -> BatchPlan {
        let max_workers = self.max_workers.max(1);
        let multiplier = self.batch_multiplier.max(1);

        if available_mb < self.low_memory_mb {
            BatchPlan {
                workers: 1,
                batch_size: 1,
            }
        } else if available_mb > self.high_memory_mb {
            BatchPlan {
                workers: max_workers,
                batch_size: max_workers * multiplier,
            }
        } else {
            let workers = (max_workers / 2).max(1);
            BatchPlan {
                workers,
                batch_size: (workers * multiplier / 2).max(workers),
            }
        }
    }

    #[must_use]
    pub fn is_critical(&self, available_mb: u64) -> bool {
        available_mb < self.critical_memory_mb
    }

    #[must_use]
    pub fn pause(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.pause_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> MemoryPolicy {
        MemoryPolicy {
            max_workers: 8,
            ..MemoryPolicy::default()
        }
    }

    #[test]
    fn low_memory_is_single_threaded() {
        assert_eq!(
            policy().plan(1500),
            BatchPlan {
                workers: 1,
                batch_size: 1
            }
        );
    }

    #[test]
    fn high_memory_uses_all_workers() {
        assert_eq!(
            policy().plan(16_000),
            BatchPlan {
                workers: 8,
                batch_size: 32
            }
        );
    }

    #[test]
    fn middle_band_halves_workers() {
        assert_eq!(
            policy().plan(4096),
            BatchPlan {
                workers: 4,
                batch_size: 8
            }
        );
    }

    #[test]
    fn thresholds_are_inclusive_of_middle_band() {
        let policy = policy();
        assert_eq!(policy.plan(2048).workers, 4);
        assert_eq!(policy.plan(8192).workers, 4);
    }

    #[test]
    fn single_worker_cap_never_reaches_zero() {
        let policy = MemoryPolicy {
            max_workers: 1,
            batch_multiplier: 1,
            ..MemoryPolicy::default()
        };
        assert_eq!(
            policy.plan(4096),
            BatchPlan {
                workers: 1,
                batch_size: 1
            }
        );
    }

    #[test]
    fn zero_workers_is_treated_as_one() {
        let policy = MemoryPolicy {
            max_workers: 0,
            ..MemoryPolicy::default()
        };
        assert_eq!(policy.plan(100_000).workers, 1);
    }

    #[test]
    fn critical_threshold() {
        let policy = policy();
        assert!(policy.is_critical(512));
        assert!(!policy.is_critical(1024));
    }

    #[test]
    fn sysinfo_probe_reports_something() {
        // Containers may report zero; only check it does not panic.
        let _ = SysinfoProbe.available_mb();
    }

    #[test]
    fn deserialize_partial_policy() {
        let policy: MemoryPolicy = toml::from_str("max_workers = 2\npause_secs = 0").unwrap();
        assert_eq!(policy.max_workers, 2);
        assert_eq!(policy.pause_secs, 0);
        assert_eq!(policy.low_memory_mb, 2048);
    }
}

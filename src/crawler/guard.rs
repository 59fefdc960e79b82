//! Process memory guard for long crawls

use crate::config::GuardConfig;
use sysinfo::{Pid, ProcessesToUpdate, System};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Source of the current process's resident memory
pub trait MemoryProbe: Send {
    /// Resident memory in bytes, or `None` if it cannot be read
    fn resident_bytes(&mut self) -> Option<u64>;
}

/// Reads this process's resident memory through `sysinfo`
pub struct SystemProbe {
    system: System,
    pid: Pid,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            pid: Pid::from_u32(std::process::id()),
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SystemProbe {
    fn resident_bytes(&mut self) -> Option<u64> {
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]));
        self.system.process(self.pid).map(|process| process.memory())
    }
}

/// Samples memory every few iterations and trips above a limit
pub struct ResourceGuard {
    probe: Box<dyn MemoryProbe>,
    limit_mb: u64,
    sample_interval: u32,
}

impl ResourceGuard {
    pub fn new(config: &GuardConfig, probe: Box<dyn MemoryProbe>) -> Self {
        Self {
            probe,
            limit_mb: config.memory_limit_mb,
            sample_interval: config.sample_interval.max(1),
        }
    }

    /// A guard reading the real process memory
    pub fn system(config: &GuardConfig) -> Self {
        Self::new(config, Box::new(SystemProbe::new()))
    }

    /// Samples memory if `iteration` falls on the sampling interval
    ///
    /// # Returns
    ///
    /// `Some(megabytes)` when the sample exceeds the limit, `None` otherwise
    /// (including iterations that are not sampled and unreadable samples).
    pub fn check(&mut self, iteration: u32) -> Option<u64> {
        if iteration == 0 || iteration % self.sample_interval != 0 {
            return None;
        }

        let Some(bytes) = self.probe.resident_bytes() else {
            tracing::debug!("Memory sample unavailable at iteration {}", iteration);
            return None;
        };
        let used_mb = bytes / BYTES_PER_MB;
        tracing::debug!("Memory usage: {} MB at iteration {}", used_mb, iteration);

        if used_mb > self.limit_mb {
            Some(used_mb)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct FixedProbe {
        bytes: Option<u64>,
        samples: Arc<AtomicU32>,
    }

    impl MemoryProbe for FixedProbe {
        fn resident_bytes(&mut self) -> Option<u64> {
            self.samples.fetch_add(1, Ordering::SeqCst);
            self.bytes
        }
    }

    fn guard(mb: Option<u64>) -> (ResourceGuard, Arc<AtomicU32>) {
        let samples = Arc::new(AtomicU32::new(0));
        let probe = FixedProbe {
            bytes: mb.map(|mb| mb * BYTES_PER_MB),
            samples: Arc::clone(&samples),
        };
        (ResourceGuard::new(&GuardConfig::default(), Box::new(probe)), samples)
    }

    #[test]
    fn test_samples_only_on_interval() {
        let (mut guard, samples) = guard(Some(100));
        for iteration in 1..=25 {
            assert_eq!(guard.check(iteration), None);
        }
        assert_eq!(samples.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_trips_above_limit() {
        let (mut guard, _) = guard(Some(2000));
        assert_eq!(guard.check(9), None);
        assert_eq!(guard.check(10), Some(2000));
    }

    #[test]
    fn test_limit_is_exclusive() {
        let (mut guard, _) = guard(Some(1500));
        assert_eq!(guard.check(10), None);
    }

    #[test]
    fn test_unreadable_sample_ignored() {
        let (mut guard, samples) = guard(None);
        assert_eq!(guard.check(10), None);
        assert_eq!(samples.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_system_probe_reads_own_process() {
        let mut probe = SystemProbe::new();
        assert!(probe.resident_bytes().is_some_and(|bytes| bytes > 0));
    }
}

//! Wiring of collectors into running samplers.

use std::fmt;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::collectors::{MemStatsCollector, SysStatsCollector};
use crate::config::RuntimeMetricsConfig;
use crate::error::Error;
use crate::process::ProcessReader;
use crate::registry::Registry;
use crate::sampler::{PeriodicSampler, SamplerHandle};
use crate::snapshot::SnapshotReader;

/// Builder for runtime metrics collection.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use runtime_metrics::registry::LocalRegistry;
/// use runtime_metrics::{RuntimeMetrics, RuntimeMetricsConfig};
///
/// let registry = Arc::new(LocalRegistry::new().with_common_tag("nf.app", "demo"));
/// let guard = RuntimeMetrics::new(registry.clone())
///     .with_config(RuntimeMetricsConfig::new().with_system_metrics(false))
///     .start()
///     .unwrap();
///
/// assert_eq!(guard.samplers().len(), 1);
/// guard.stop();
/// ```
pub struct RuntimeMetrics {
    registry: Arc<dyn Registry>,
    clock: Arc<dyn Clock>,
    reader: Arc<dyn SnapshotReader>,
    config: RuntimeMetricsConfig,
}

impl RuntimeMetrics {
    /// Collects into `registry` with the system clock, a [`ProcessReader`]
    /// and the default configuration.
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self {
            registry,
            clock: Arc::new(SystemClock),
            reader: Arc::new(ProcessReader::new()),
            config: RuntimeMetricsConfig::default(),
        }
    }

    /// Uses `clock` to compute the time since the last GC.
    #[must_use]
    pub fn with_clock<C: Clock>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Uses `reader` to take snapshots.
    #[must_use]
    pub fn with_reader<R: SnapshotReader>(mut self, reader: R) -> Self {
        self.reader = Arc::new(reader);
        self
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: RuntimeMetricsConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers the meters and starts one sampler per enabled collector.
    ///
    /// Samplers that were already started are stopped again if a later one
    /// fails to start.
    pub fn start(self) -> Result<RuntimeMetricsGuard, Error> {
        if self.config.sampler_count() == 0 {
            return Err(Error::NoCollectors);
        }

        let mut samplers = Vec::with_capacity(self.config.sampler_count());
        if self.config.collect_memory {
            let collector = MemStatsCollector::new(
                self.registry.clone(),
                self.clock.clone(),
                self.reader.clone(),
            );
            samplers.push(PeriodicSampler::new(collector).start()?);
        }
        if self.config.collect_system {
            let collector = SysStatsCollector::new(self.registry.clone(), self.reader.clone());
            samplers.push(PeriodicSampler::new(collector).start()?);
        }
        for collector in self.config.custom_collectors {
            samplers.push(PeriodicSampler::new(collector).start()?);
        }

        Ok(RuntimeMetricsGuard { samplers })
    }
}

impl fmt::Debug for RuntimeMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeMetrics")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Keeps the samplers started by [`RuntimeMetrics`] running.
///
/// Dropping the guard stops every sampler.
#[must_use = "dropping the guard stops collection"]
#[derive(Debug)]
pub struct RuntimeMetricsGuard {
    samplers: Vec<SamplerHandle>,
}

impl RuntimeMetricsGuard {
    /// The running samplers.
    pub fn samplers(&self) -> &[SamplerHandle] {
        &self.samplers
    }

    /// Stops all samplers and waits for their threads to exit.
    pub fn stop(self) {
        for sampler in self.samplers {
            sampler.stop();
        }
    }

    /// Lets all samplers run until the process exits.
    pub fn detach(self) {
        for sampler in self.samplers {
            sampler.detach();
        }
    }
}

/// Starts memory and system metrics collection into `registry`.
pub fn collect_runtime_metrics(registry: Arc<dyn Registry>) -> Result<RuntimeMetricsGuard, Error> {
    RuntimeMetrics::new(registry).start()
}

/// Starts memory metrics collection into `registry`.
pub fn collect_mem_stats(registry: Arc<dyn Registry>) -> Result<RuntimeMetricsGuard, Error> {
    collect_mem_stats_with_clock(registry, SystemClock)
}

/// Starts memory metrics collection into `registry`, timing GC age with
/// `clock`.
pub fn collect_mem_stats_with_clock<C: Clock>(
    registry: Arc<dyn Registry>,
    clock: C,
) -> Result<RuntimeMetricsGuard, Error> {
    RuntimeMetrics::new(registry)
        .with_clock(clock)
        .with_config(RuntimeMetricsConfig::new().with_system_metrics(false))
        .start()
}

/// Starts thread and file handle metrics collection into `registry`.
pub fn collect_sys_stats(registry: Arc<dyn Registry>) -> Result<RuntimeMetricsGuard, Error> {
    RuntimeMetrics::new(registry)
        .with_config(RuntimeMetricsConfig::new().with_memory_metrics(false))
        .start()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::collector::Collector;
    use crate::registry::LocalRegistry;
    use crate::snapshot::Snapshot;

    struct Noop;

    impl Collector for Noop {
        fn collect(&mut self) {}

        fn name(&self) -> &'static str {
            "noop"
        }
    }

    #[test]
    fn test_nothing_to_collect() {
        let config = RuntimeMetricsConfig::new()
            .with_memory_metrics(false)
            .with_system_metrics(false);
        let result = RuntimeMetrics::new(Arc::new(LocalRegistry::new()))
            .with_config(config)
            .start();
        assert!(matches!(result, Err(Error::NoCollectors)));
    }

    #[test]
    fn test_start_registers_meters() {
        let registry = Arc::new(LocalRegistry::new());
        let guard = RuntimeMetrics::new(registry.clone())
            .with_clock(ManualClock::new())
            .with_reader(Snapshot::default)
            .with_config(RuntimeMetricsConfig::new().add_collector(Noop))
            .start()
            .unwrap();

        let names: Vec<_> = guard.samplers().iter().map(|s| s.name()).collect();
        assert_eq!(names, ["memory", "system", "noop"]);
        // 5 memory gauges, the pause timer and 3 system gauges; counters
        // appear on the first tick
        assert_eq!(registry.meters().len(), 9);
        guard.stop();
    }

    #[test]
    fn test_entry_points() {
        let registry = Arc::new(LocalRegistry::new());

        let guard = collect_mem_stats_with_clock(registry.clone(), ManualClock::new()).unwrap();
        assert_eq!(guard.samplers()[0].name(), "memory");
        drop(guard);

        let guard = collect_sys_stats(registry.clone()).unwrap();
        assert_eq!(guard.samplers().len(), 1);
        assert_eq!(guard.samplers()[0].name(), "system");
        drop(guard);

        let guard = collect_runtime_metrics(registry).unwrap();
        assert_eq!(guard.samplers().len(), 2);
        guard.stop();
    }
}

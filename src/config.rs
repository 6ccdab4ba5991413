//! Configuration for runtime metrics collection.

use std::fmt;

use crate::collector::Collector;

/// Selects what [`RuntimeMetrics`](crate::RuntimeMetrics) collects.
///
/// Every enabled collector runs on its own sampler, at
/// [`SAMPLING_INTERVAL`](crate::SAMPLING_INTERVAL).
pub struct RuntimeMetricsConfig {
    /// Enable memory and GC metrics.
    ///
    /// Collects: `mem.heapBytesAllocated`, `mem.allocationRate`,
    /// `mem.maxHeapBytes`, `mem.numLiveObjects`, `mem.objectsAllocated`,
    /// `mem.objectsFreed`, `gc.pauseTime`, `gc.timeSinceLastGC`, `gc.count`,
    /// `gc.forcedCount`, `gc.cpuPercentage`
    ///
    /// Default: true
    pub collect_memory: bool,

    /// Enable thread and file handle metrics.
    ///
    /// Collects: `go.numGoroutines`, `fh.allocated`, `fh.max`
    ///
    /// Default: true
    pub collect_system: bool,

    /// Custom collectors to run alongside the built-in ones.
    pub custom_collectors: Vec<Box<dyn Collector>>,
}

impl Default for RuntimeMetricsConfig {
    fn default() -> Self {
        Self {
            collect_memory: true,
            collect_system: true,
            custom_collectors: Vec::new(),
        }
    }
}

impl RuntimeMetricsConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables memory metrics.
    #[must_use]
    pub fn with_memory_metrics(mut self, enabled: bool) -> Self {
        self.collect_memory = enabled;
        self
    }

    /// Enables or disables system metrics.
    #[must_use]
    pub fn with_system_metrics(mut self, enabled: bool) -> Self {
        self.collect_system = enabled;
        self
    }

    /// Adds a custom collector.
    #[must_use]
    pub fn add_collector<C: Collector>(mut self, collector: C) -> Self {
        self.custom_collectors.push(Box::new(collector));
        self
    }

    /// Number of samplers this configuration starts.
    pub fn sampler_count(&self) -> usize {
        usize::from(self.collect_memory)
            + usize::from(self.collect_system)
            + self.custom_collectors.len()
    }
}

impl fmt::Debug for RuntimeMetricsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let custom: Vec<_> = self.custom_collectors.iter().map(|c| c.name()).collect();
        f.debug_struct("RuntimeMetricsConfig")
            .field("collect_memory", &self.collect_memory)
            .field("collect_system", &self.collect_system)
            .field("custom_collectors", &custom)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl Collector for Noop {
        fn collect(&mut self) {}

        fn name(&self) -> &'static str {
            "noop"
        }
    }

    #[test]
    fn test_defaults() {
        let config = RuntimeMetricsConfig::default();
        assert!(config.collect_memory);
        assert!(config.collect_system);
        assert_eq!(config.sampler_count(), 2);
    }

    #[test]
    fn test_builder() {
        let config = RuntimeMetricsConfig::new()
            .with_memory_metrics(false)
            .with_system_metrics(false)
            .add_collector(Noop);
        assert_eq!(config.sampler_count(), 1);
        assert_eq!(
            format!("{config:?}"),
            "RuntimeMetricsConfig { collect_memory: false, collect_system: false, \
             custom_collectors: [\"noop\"] }"
        );
    }
}

//! Memory and GC statistics collector.

use std::sync::Arc;

use log::debug;

use super::{
    ALLOCATION_RATE, GC_COUNT, GC_CPU_PERCENTAGE, GC_FORCED_COUNT, GC_PAUSE_TIME,
    GC_TIME_SINCE_LAST, HEAP_BYTES_ALLOCATED, MAX_HEAP_BYTES, NUM_LIVE_OBJECTS,
    OBJECTS_ALLOCATED, OBJECTS_FREED,
};
use crate::clock::Clock;
use crate::collector::Collector;
use crate::monotonic::MonotonicCounter;
use crate::protocol::MeterId;
use crate::registry::{Gauge, Registry, Timer};
use crate::snapshot::{Snapshot, SnapshotReader};

/// Publishes heap, allocation and GC statistics.
///
/// Instantaneous values go to gauges, cumulative totals go through
/// [`MonotonicCounter`]s. GC pause time is reported as the difference to the
/// previous tick's total, recorded into a timer.
pub struct MemStatsCollector {
    clock: Arc<dyn Clock>,
    reader: Arc<dyn SnapshotReader>,

    bytes_alloc: Arc<dyn Gauge>,
    allocation_rate: MonotonicCounter,
    total_bytes_system: Arc<dyn Gauge>,
    num_live_objects: Arc<dyn Gauge>,
    objects_allocated: MonotonicCounter,
    objects_freed: MonotonicCounter,

    gc_last_pause_total: u64,
    gc_pause_time: Arc<dyn Timer>,
    gc_age: Arc<dyn Gauge>,
    gc_count: MonotonicCounter,
    forced_gc_count: MonotonicCounter,
    gc_cpu_percentage: Arc<dyn Gauge>,
}

impl MemStatsCollector {
    /// Creates the collector and registers its gauges and timer.
    ///
    /// Counters are registered lazily, on the first tick.
    pub fn new(
        registry: Arc<dyn Registry>,
        clock: Arc<dyn Clock>,
        reader: Arc<dyn SnapshotReader>,
    ) -> Self {
        let gauge = |name: &str| registry.gauge(MeterId::new(name));
        let counter = |name: &str| MonotonicCounter::new(registry.clone(), name);

        Self {
            bytes_alloc: gauge(HEAP_BYTES_ALLOCATED),
            allocation_rate: counter(ALLOCATION_RATE),
            total_bytes_system: gauge(MAX_HEAP_BYTES),
            num_live_objects: gauge(NUM_LIVE_OBJECTS),
            objects_allocated: counter(OBJECTS_ALLOCATED),
            objects_freed: counter(OBJECTS_FREED),
            gc_last_pause_total: 0,
            gc_pause_time: registry.timer(MeterId::new(GC_PAUSE_TIME)),
            gc_age: gauge(GC_TIME_SINCE_LAST),
            gc_count: counter(GC_COUNT),
            forced_gc_count: counter(GC_FORCED_COUNT),
            gc_cpu_percentage: gauge(GC_CPU_PERCENTAGE),
            clock,
            reader,
        }
    }

    /// Projects `mem` onto the meters.
    pub fn update(&mut self, mem: &Snapshot) {
        self.bytes_alloc.set(mem.alloc as f64);
        self.allocation_rate.set(mem.total_alloc as i64);
        self.total_bytes_system.set(mem.sys as f64);
        self.num_live_objects.set(mem.live_objects() as f64);
        self.objects_allocated.set(mem.mallocs as i64);
        self.objects_freed.set(mem.frees as i64);

        // Not clamped: a reset wraps to a negative amount the timer drops.
        let nanos_pause = mem.pause_total_ns.wrapping_sub(self.gc_last_pause_total) as i64;
        self.gc_pause_time.record_nanos(nanos_pause);
        self.gc_last_pause_total = mem.pause_total_ns;

        let time_since_last_gc = self.clock.nanos().wrapping_sub(mem.last_gc as i64);
        self.gc_age.set(time_since_last_gc as f64 / 1e9);

        self.gc_count.set(i64::from(mem.num_gc));
        self.forced_gc_count.set(i64::from(mem.num_forced_gc));
        self.gc_cpu_percentage.set(mem.gc_cpu_fraction * 100.0);
    }
}

impl Collector for MemStatsCollector {
    fn collect(&mut self) {
        debug!("Collecting memory stats");
        let mem = self.reader.read();
        self.update(&mem);
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

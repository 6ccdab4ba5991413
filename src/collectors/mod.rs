//! Built-in collectors.
//!
//! - [`MemStatsCollector`]: heap, allocation and GC statistics
//! - [`SysStatsCollector`]: threads and file handles
//!
//! The meter names below are what dashboards and alerts query, so they are
//! kept stable.

mod memory;
mod system;

pub use memory::MemStatsCollector;
pub use system::SysStatsCollector;

/// Gauge: bytes of live heap allocations.
pub const HEAP_BYTES_ALLOCATED: &str = "mem.heapBytesAllocated";
/// Counter: bytes allocated since the previous tick.
pub const ALLOCATION_RATE: &str = "mem.allocationRate";
/// Gauge: bytes reserved from the system.
pub const MAX_HEAP_BYTES: &str = "mem.maxHeapBytes";
/// Gauge: allocations not yet freed.
pub const NUM_LIVE_OBJECTS: &str = "mem.numLiveObjects";
/// Counter: allocations since the previous tick.
pub const OBJECTS_ALLOCATED: &str = "mem.objectsAllocated";
/// Counter: frees since the previous tick.
pub const OBJECTS_FREED: &str = "mem.objectsFreed";
/// Timer: GC pause time accumulated since the previous tick.
pub const GC_PAUSE_TIME: &str = "gc.pauseTime";
/// Gauge: seconds since the last GC.
pub const GC_TIME_SINCE_LAST: &str = "gc.timeSinceLastGC";
/// Counter: GC cycles since the previous tick.
pub const GC_COUNT: &str = "gc.count";
/// Counter: forced GC cycles since the previous tick.
pub const GC_FORCED_COUNT: &str = "gc.forcedCount";
/// Gauge: percentage of CPU time spent in GC.
pub const GC_CPU_PERCENTAGE: &str = "gc.cpuPercentage";
/// Gauge: live threads.
pub const NUM_THREADS: &str = "go.numGoroutines";
/// Gauge: open file handles.
pub const FILE_HANDLES_ALLOCATED: &str = "fh.allocated";
/// Gauge: maximum number of file handles.
pub const FILE_HANDLES_MAX: &str = "fh.max";

//! Point-in-time readings of the runtime.

use serde::{Deserialize, Serialize};

/// An immutable reading of the runtime counters taken at one instant.
///
/// Cumulative fields only ever grow while the source is alive; the
/// collectors turn them into increments. GC fields are zero for runtimes
/// without a garbage collector.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Bytes of live heap allocations.
    pub alloc: u64,
    /// Cumulative bytes allocated, including freed memory.
    pub total_alloc: u64,
    /// Bytes reserved from the operating system.
    pub sys: u64,
    /// Cumulative number of allocations.
    pub mallocs: u64,
    /// Cumulative number of frees.
    pub frees: u64,
    /// Cumulative GC pause time in nanoseconds.
    pub pause_total_ns: u64,
    /// End of the last GC, in nanoseconds since the UNIX epoch.
    pub last_gc: u64,
    /// Number of completed GC cycles.
    pub num_gc: u32,
    /// Number of GC cycles forced by the application.
    pub num_forced_gc: u32,
    /// Fraction of the available CPU time used by the GC.
    pub gc_cpu_fraction: f64,
    /// Number of live threads.
    pub num_threads: Option<u64>,
    /// Number of open file handles.
    pub open_file_handles: Option<u64>,
    /// Maximum number of file handles the process may open.
    pub max_file_handles: Option<u64>,
}

impl Snapshot {
    /// Number of allocations not yet freed.
    pub fn live_objects(&self) -> u64 {
        self.mallocs.saturating_sub(self.frees)
    }
}

/// Produces snapshots of the running process.
///
/// Reading must not fail; data the platform cannot provide is reported as
/// zero or `None`.
pub trait SnapshotReader: Send + Sync + 'static {
    /// Takes a fresh snapshot.
    fn read(&self) -> Snapshot;
}

impl<F> SnapshotReader for F
where
    F: Fn() -> Snapshot + Send + Sync + 'static,
{
    fn read(&self) -> Snapshot {
        self()
    }
}

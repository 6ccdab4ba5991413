//! Snapshots of the current process.

use std::alloc::{GlobalAlloc, System};
use std::fmt;

use stats_alloc::StatsAlloc;

use crate::snapshot::{Snapshot, SnapshotReader};

/// Reads runtime statistics of the current process.
///
/// Allocation statistics come from a [`StatsAlloc`] installed as the global
/// allocator. Without one, the allocation fields are zero:
///
/// ```
/// use std::alloc::System;
/// use stats_alloc::{StatsAlloc, INSTRUMENTED_SYSTEM};
/// use runtime_metrics::ProcessReader;
///
/// #[global_allocator]
/// static GLOBAL: &StatsAlloc<System> = &INSTRUMENTED_SYSTEM;
///
/// fn main() {
///     let reader = ProcessReader::with_allocator(GLOBAL);
/// #   let _ = reader;
/// }
/// ```
///
/// The reserved size is the resident set size, the thread and file-handle
/// counts come from the OS where it exposes them. Rust has no garbage
/// collector so the GC fields stay zero; hosts embedding a collected runtime
/// should provide their own [`SnapshotReader`].
pub struct ProcessReader<A: GlobalAlloc + 'static = System> {
    allocator: Option<&'static StatsAlloc<A>>,
}

impl ProcessReader {
    /// Creates a reader without allocation statistics.
    pub fn new() -> Self {
        Self { allocator: None }
    }
}

impl Default for ProcessReader {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: GlobalAlloc + Sync + 'static> ProcessReader<A> {
    /// Creates a reader taking allocation statistics from `allocator`.
    pub fn with_allocator(allocator: &'static StatsAlloc<A>) -> Self {
        Self {
            allocator: Some(allocator),
        }
    }
}

impl<A: GlobalAlloc + 'static> fmt::Debug for ProcessReader<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessReader")
            .field("allocator", &self.allocator.is_some())
            .finish()
    }
}

impl<A: GlobalAlloc + Sync + 'static> SnapshotReader for ProcessReader<A> {
    fn read(&self) -> Snapshot {
        let mut snapshot = Snapshot {
            sys: get_rss_bytes().unwrap_or(0),
            num_threads: get_thread_count(),
            open_file_handles: get_open_fds(),
            max_file_handles: get_max_fds(),
            ..Default::default()
        };

        if let Some(allocator) = self.allocator {
            let stats = allocator.stats();
            let grown = stats.bytes_reallocated.max(0) as u64;
            let live = stats.bytes_allocated as i128 + stats.bytes_reallocated as i128
                - stats.bytes_deallocated as i128;

            snapshot.alloc = live.max(0) as u64;
            snapshot.total_alloc = stats.bytes_allocated as u64 + grown;
            snapshot.mallocs = stats.allocations as u64;
            snapshot.frees = stats.deallocations as u64;
        }

        snapshot
    }
}

/// Gets the RSS (Resident Set Size) in bytes.
#[cfg(target_os = "linux")]
fn get_rss_bytes() -> Option<u64> {
    use std::fs;

    // Format: size resident shared text lib data dt, in pages
    let statm = fs::read_to_string("/proc/self/statm").ok()?;
    let resident_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if page_size <= 0 {
        return None;
    }
    Some(resident_pages * page_size as u64)
}

/// Gets the RSS (Resident Set Size) in bytes.
#[cfg(target_os = "macos")]
fn get_rss_bytes() -> Option<u64> {
    use std::mem;

    unsafe {
        let mut info: libc::rusage = mem::zeroed();
        if libc::getrusage(libc::RUSAGE_SELF, &mut info) == 0 {
            // ru_maxrss is in bytes here
            Some(info.ru_maxrss as u64)
        } else {
            None
        }
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn get_rss_bytes() -> Option<u64> {
    None
}

/// Gets the number of threads in the current process.
#[cfg(target_os = "linux")]
fn get_thread_count() -> Option<u64> {
    let entries = std::fs::read_dir("/proc/self/task").ok()?;
    Some(entries.count() as u64)
}

#[cfg(not(target_os = "linux"))]
fn get_thread_count() -> Option<u64> {
    None
}

/// Gets the number of open file descriptors.
#[cfg(unix)]
fn get_open_fds() -> Option<u64> {
    let dir = if cfg!(target_os = "linux") {
        "/proc/self/fd"
    } else {
        "/dev/fd"
    };
    let entries = std::fs::read_dir(dir).ok()?;
    // the directory handle itself shows up in the listing
    Some((entries.count() as u64).saturating_sub(1))
}

#[cfg(not(unix))]
fn get_open_fds() -> Option<u64> {
    None
}

/// Gets the soft limit on open file descriptors.
#[cfg(unix)]
fn get_max_fds() -> Option<u64> {
    use std::mem;

    unsafe {
        let mut limit: libc::rlimit = mem::zeroed();
        if libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) == 0 {
            Some(limit.rlim_cur as u64)
        } else {
            None
        }
    }
}

#[cfg(not(unix))]
fn get_max_fds() -> Option<u64> {
    None
}

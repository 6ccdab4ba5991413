//! Thread and file-handle collector.

use std::sync::Arc;

use log::debug;

use super::{FILE_HANDLES_ALLOCATED, FILE_HANDLES_MAX, NUM_THREADS};
use crate::collector::Collector;
use crate::protocol::MeterId;
use crate::registry::{Gauge, Registry};
use crate::snapshot::{Snapshot, SnapshotReader};

/// Publishes the number of live threads and file handle usage.
///
/// A value the platform does not report is skipped: its gauge is not
/// written on that tick rather than set to zero.
pub struct SysStatsCollector {
    reader: Arc<dyn SnapshotReader>,
    cur_open: Arc<dyn Gauge>,
    max_open: Arc<dyn Gauge>,
    num_threads: Arc<dyn Gauge>,
}

impl SysStatsCollector {
    /// Creates the collector and registers its gauges.
    pub fn new(registry: Arc<dyn Registry>, reader: Arc<dyn SnapshotReader>) -> Self {
        Self {
            reader,
            cur_open: registry.gauge(MeterId::new(FILE_HANDLES_ALLOCATED)),
            max_open: registry.gauge(MeterId::new(FILE_HANDLES_MAX)),
            num_threads: registry.gauge(MeterId::new(NUM_THREADS)),
        }
    }

    /// Projects the system fields of `snapshot` onto the gauges.
    pub fn update(&mut self, snapshot: &Snapshot) {
        set_if_known(&*self.max_open, FILE_HANDLES_MAX, snapshot.max_file_handles);
        set_if_known(
            &*self.cur_open,
            FILE_HANDLES_ALLOCATED,
            snapshot.open_file_handles,
        );
        set_if_known(&*self.num_threads, NUM_THREADS, snapshot.num_threads);
    }
}

fn set_if_known(gauge: &dyn Gauge, name: &str, value: Option<u64>) {
    match value {
        Some(value) => gauge.set(value as f64),
        None => debug!("{name} is not available on this platform"),
    }
}

impl Collector for SysStatsCollector {
    fn collect(&mut self) {
        debug!("Collecting system stats");
        let snapshot = self.reader.read();
        self.update(&snapshot);
    }

    fn name(&self) -> &'static str {
        "system"
    }
}

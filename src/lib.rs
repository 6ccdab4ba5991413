//! Periodic runtime metrics for long running services.
//!
//! This crate samples the health of the running process every
//! [`SAMPLING_INTERVAL`] and publishes it into a metrics [`Registry`]:
//!
//! - Memory: live heap bytes, reserved bytes, live objects, allocation rate
//! - GC: pause time, time since the last collection, cycle counts, CPU share
//! - System: live threads, open and maximum file handles
//!
//! Cumulative runtime totals are turned into increments by
//! [`MonotonicCounter`], so the registry only ever sees non-negative counter
//! additions.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use runtime_metrics::registry::LocalRegistry;
//!
//! let registry = Arc::new(LocalRegistry::new());
//! let guard = runtime_metrics::collect_runtime_metrics(registry.clone()).unwrap();
//!
//! // ... every 30 seconds the meters in `registry` are updated ...
//!
//! guard.stop();
//! ```
//!
//! Collection runs on background threads until the returned guard is dropped
//! or stopped. Call [`RuntimeMetricsGuard::detach`] to collect for the rest of
//! the process lifetime.
//!
//! [`Registry`]: registry::Registry

#![warn(missing_docs)]

mod clock;
mod collector;
mod config;
mod error;
mod monotonic;
mod process;
mod protocol;
mod runtime;
mod sampler;
mod snapshot;

pub mod collectors;
pub mod registry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use collector::Collector;
pub use config::RuntimeMetricsConfig;
pub use error::Error;
pub use monotonic::MonotonicCounter;
pub use process::ProcessReader;
pub use protocol::{Measurement, MeterId, STATISTIC_TAG};
pub use runtime::{
    collect_mem_stats, collect_mem_stats_with_clock, collect_runtime_metrics, collect_sys_stats,
    RuntimeMetrics, RuntimeMetricsGuard,
};
pub use sampler::{PeriodicSampler, SamplerHandle, SAMPLING_INTERVAL};
pub use snapshot::{Snapshot, SnapshotReader};

//! The registry capabilities the collectors publish into.
//!
//! A registry hands out meter handles keyed by [`MeterId`]. Handles are
//! fire-and-forget sinks: aggregation, encoding, and publishing belong to
//! the registry. [`LocalRegistry`] is an in-process implementation that
//! keeps the aggregated values until they are measured.

mod local;

use std::sync::Arc;
use std::time::Duration;

use crate::protocol::MeterId;

pub use local::{LocalCounter, LocalGauge, LocalRegistry, LocalTimer, Meter};

/// A meter holding only the most recently set value.
pub trait Gauge: Send + Sync {
    /// Overwrites the value of the gauge.
    fn set(&self, value: f64);
}

/// An additive counter.
pub trait Counter: Send + Sync {
    /// Adds `delta` to the counter.
    fn add(&self, delta: i64);
}

/// A sink for durations.
pub trait Timer: Send + Sync {
    /// Records a single duration.
    fn record(&self, duration: Duration);

    /// Records a signed amount of nanoseconds.
    ///
    /// Negative amounts are dropped.
    fn record_nanos(&self, nanos: i64) {
        if let Ok(nanos) = u64::try_from(nanos) {
            self.record(Duration::from_nanos(nanos));
        }
    }
}

/// Creates or looks up meters.
///
/// Implementations should return the same underlying meter for equal ids so
/// that values from repeated lookups are aggregated together.
pub trait Registry: Send + Sync + 'static {
    /// Returns the gauge for `id`.
    fn gauge(&self, id: MeterId) -> Arc<dyn Gauge>;

    /// Returns the additive counter for `id`.
    fn counter(&self, id: MeterId) -> Arc<dyn Counter>;

    /// Returns the timer for `id`.
    fn timer(&self, id: MeterId) -> Arc<dyn Timer>;
}

impl<R: Registry + ?Sized> Registry for Arc<R> {
    fn gauge(&self, id: MeterId) -> Arc<dyn Gauge> {
        (**self).gauge(id)
    }

    fn counter(&self, id: MeterId) -> Arc<dyn Counter> {
        (**self).counter(id)
    }

    fn timer(&self, id: MeterId) -> Arc<dyn Timer> {
        (**self).timer(id)
    }
}

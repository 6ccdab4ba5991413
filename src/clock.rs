//! Time sources used to compute "time since" gauges.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A source of nanosecond timestamps.
///
/// Timestamps are measured from the UNIX epoch so they can be compared with
/// runtime-provided timestamps such as [`Snapshot::last_gc`].
///
/// [`Snapshot::last_gc`]: crate::Snapshot::last_gc
pub trait Clock: Send + Sync + 'static {
    /// Returns the current time in nanoseconds.
    fn nanos(&self) -> i64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn nanos(&self) -> i64 {
        (**self).nanos()
    }
}

/// The wall clock of the host.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn nanos(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use runtime_metrics::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// clock.set_from_duration(Duration::from_secs(60));
/// assert_eq!(clock.nanos(), 60_000_000_000);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicI64,
}

impl ManualClock {
    /// Creates a clock stopped at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the clock to an absolute nanosecond value.
    pub fn set_nanos(&self, nanos: i64) {
        self.nanos.store(nanos, Ordering::SeqCst);
    }

    /// Sets the clock to `duration` past the epoch.
    pub fn set_from_duration(&self, duration: Duration) {
        self.set_nanos(duration.as_nanos() as i64);
    }

    /// Moves the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        self.nanos
            .fetch_add(duration.as_nanos() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn nanos(&self) -> i64 {
        self.nanos.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new();
        assert_eq!(clock.nanos(), 0);

        clock.set_from_duration(Duration::from_secs(2));
        assert_eq!(clock.nanos(), 2_000_000_000);

        clock.advance(Duration::from_millis(5));
        assert_eq!(clock.nanos(), 2_005_000_000);

        clock.set_nanos(-1);
        assert_eq!(clock.nanos(), -1);
    }

    #[test]
    fn test_shared_manual_clock() {
        let clock = Arc::new(ManualClock::new());
        let injected: Arc<dyn Clock> = Arc::new(clock.clone());

        clock.set_from_duration(Duration::from_secs(90));
        assert_eq!(injected.nanos(), 90_000_000_000);
    }

    #[test]
    fn test_system_clock_is_past_epoch() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.nanos() > 1_577_836_800_000_000_000);
    }
}

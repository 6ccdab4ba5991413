//! Turns cumulative values into counter increments.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};

use log::debug;

use crate::protocol::MeterId;
use crate::registry::{Counter, Registry};

/// Tracks a monotonically increasing value and publishes its increments.
///
/// Runtimes usually expose cumulative totals ("bytes ever allocated").
/// Each [`set`](Self::set) forwards the difference to the previous value to an
/// additive counter, which keeps rate-based alerting correct. The first call
/// only establishes a baseline, and a value that goes backwards (a reset or
/// a wrapped source) is stored but not forwarded, so the counter never
/// receives a negative amount.
///
/// The underlying counter is created lazily on the first `set`, exactly once
/// even if several threads race on that first call.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use runtime_metrics::registry::LocalRegistry;
/// use runtime_metrics::MonotonicCounter;
///
/// let registry = Arc::new(LocalRegistry::new());
/// let counter = MonotonicCounter::new(registry.clone(), "mem.objectsAllocated");
///
/// counter.set(200);
/// counter.set(400);
/// assert_eq!(counter.count(), 400);
///
/// let measurements = registry.measurements();
/// assert_eq!(measurements[0].value, 200.0);
/// ```
pub struct MonotonicCounter {
    value: AtomicI64,
    registry: Arc<dyn Registry>,
    id: MeterId,
    counter: OnceLock<Arc<dyn Counter>>,
}

impl MonotonicCounter {
    /// Creates a tracker for a counter named `name` without tags.
    pub fn new(registry: Arc<dyn Registry>, name: impl Into<String>) -> Self {
        Self::with_id(registry, MeterId::new(name))
    }

    /// Creates a tracker for the counter identified by `id`.
    pub fn with_id(registry: Arc<dyn Registry>, id: MeterId) -> Self {
        Self {
            value: AtomicI64::new(0),
            registry,
            id,
            counter: OnceLock::new(),
        }
    }

    /// Records `amount` as the new absolute value.
    pub fn set(&self, amount: i64) {
        let mut baseline = false;
        let counter = self.counter.get_or_init(|| {
            // Publish the baseline together with the handle; callers that
            // waited on this initialization diff against it.
            self.value.store(amount, Ordering::SeqCst);
            baseline = true;
            self.registry.counter(self.id.clone())
        });

        if !baseline {
            let prev = self.value.load(Ordering::SeqCst);
            match amount.checked_sub(prev) {
                Some(delta) if delta >= 0 => counter.add(delta),
                _ => debug!(
                    "{}: value went from {} to {}, skipping increment",
                    self.id, prev, amount
                ),
            }
        }

        self.value.store(amount, Ordering::SeqCst);
    }

    /// The last absolute value passed to [`set`](Self::set).
    pub fn count(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }

    /// The id of the underlying counter.
    pub fn id(&self) -> &MeterId {
        &self.id
    }
}

impl fmt::Debug for MonotonicCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonotonicCounter")
            .field("id", &self.id)
            .field("value", &self.count())
            .field("initialized", &self.counter.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    use rstest::rstest;

    use super::*;
    use crate::registry::{Gauge, LocalRegistry, Timer};

    /// Wraps a registry and counts how many counters were requested.
    #[derive(Default)]
    struct CountingRegistry {
        inner: LocalRegistry,
        counters_created: AtomicUsize,
    }

    impl Registry for CountingRegistry {
        fn gauge(&self, id: MeterId) -> Arc<dyn Gauge> {
            self.inner.gauge(id)
        }

        fn counter(&self, id: MeterId) -> Arc<dyn Counter> {
            self.counters_created.fetch_add(1, Ordering::SeqCst);
            // widen the window in which other threads race the first `set`
            thread::sleep(Duration::from_millis(5));
            self.inner.counter(id)
        }

        fn timer(&self, id: MeterId) -> Arc<dyn Timer> {
            self.inner.timer(id)
        }
    }

    fn emitted(registry: &LocalRegistry, name: &str) -> i64 {
        registry.local_counter(MeterId::new(name)).count()
    }

    #[test]
    fn test_first_set_is_baseline() {
        let registry = Arc::new(LocalRegistry::new());
        let counter = MonotonicCounter::new(registry.clone(), "test");

        assert!(registry.meters().is_empty());
        counter.set(200);
        assert_eq!(counter.count(), 200);
        assert_eq!(registry.meters().len(), 1);
        assert_eq!(emitted(&registry, "test"), 0);
        assert!(registry.measurements().is_empty());
    }

    #[test]
    fn test_reset_scenario() {
        let registry = Arc::new(LocalRegistry::new());
        let counter = MonotonicCounter::new(registry.clone(), "test");
        let underlying = registry.local_counter(MeterId::new("test"));

        counter.set(200);
        assert_eq!(underlying.count(), 0);
        assert_eq!(counter.count(), 200);

        counter.set(400);
        assert_eq!(underlying.count(), 200);
        assert_eq!(counter.count(), 400);

        counter.set(350);
        assert_eq!(underlying.count(), 200);
        assert_eq!(counter.count(), 350);

        counter.set(500);
        assert_eq!(underlying.count(), 350);
        assert_eq!(counter.count(), 500);
    }

    #[rstest]
    #[case::flat(&[7, 7, 7])]
    #[case::steady(&[0, 10, 20, 30])]
    #[case::uneven(&[100, 101, 150, 150, 1_000])]
    #[case::negative_start(&[-50, -10, 0, 25])]
    fn test_monotone_sum(#[case] values: &[i64]) {
        let registry = Arc::new(LocalRegistry::new());
        let counter = MonotonicCounter::new(registry.clone(), "test");
        for v in values {
            counter.set(*v);
        }
        let first = values[0];
        let last = values[values.len() - 1];
        assert_eq!(emitted(&registry, "test"), last - first);
        assert_eq!(counter.count(), last);
    }

    #[test]
    fn test_overflowing_delta_is_suppressed() {
        let registry = Arc::new(LocalRegistry::new());
        let counter = MonotonicCounter::new(registry.clone(), "test");
        counter.set(i64::MIN);
        counter.set(i64::MAX);
        assert_eq!(emitted(&registry, "test"), 0);
        assert_eq!(counter.count(), i64::MAX);
    }

    #[test]
    fn test_concurrent_first_set_creates_one_counter() {
        let registry = Arc::new(CountingRegistry::default());
        let counter = Arc::new(MonotonicCounter::new(registry.clone(), "test"));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = counter.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    counter.set(1_000);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.counters_created.load(Ordering::SeqCst), 1);
        assert_eq!(counter.count(), 1_000);
        // every racer diffed against the published baseline
        assert_eq!(emitted(&registry.inner, "test"), 0);
    }

    #[test]
    fn test_concurrent_sets_settle_on_a_final_value() {
        let registry = Arc::new(LocalRegistry::new());
        let counter = Arc::new(MonotonicCounter::new(registry.clone(), "test"));
        counter.set(0);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let counter = counter.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        // never a torn or foreign value
                        let seen = counter.count();
                        assert!((0..4_000).contains(&seen));
                        counter.set(t * 1_000 + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // the last store wins, and it is some thread's last value
        let last = counter.count();
        assert!([99, 1_099, 2_099, 3_099].contains(&last));
        assert!(emitted(&registry, "test") >= 0);
    }
}

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::warn;

use super::{Counter, Gauge, Registry, Timer};
use crate::protocol::{Measurement, MeterId};

/// A gauge that remembers the last value until it is measured.
#[derive(Debug)]
pub struct LocalGauge {
    id: MeterId,
    bits: AtomicU64,
}

impl LocalGauge {
    fn new(id: MeterId) -> Self {
        Self {
            id,
            bits: AtomicU64::new(f64::NAN.to_bits()),
        }
    }

    /// The id of this gauge.
    pub fn id(&self) -> &MeterId {
        &self.id
    }

    /// The current value, `NaN` if nothing was set since the last measure.
    pub fn value(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }

    /// Takes the current value, leaving the gauge unset.
    pub fn measure(&self) -> Vec<Measurement> {
        let value = f64::from_bits(self.bits.swap(f64::NAN.to_bits(), Ordering::SeqCst));
        if value.is_nan() {
            Vec::new()
        } else {
            vec![Measurement::new(self.id.with_stat("gauge"), value)]
        }
    }
}

impl Gauge for LocalGauge {
    fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::SeqCst);
    }
}

/// A counter accumulating additions until it is measured.
#[derive(Debug)]
pub struct LocalCounter {
    id: MeterId,
    count: AtomicI64,
}

impl LocalCounter {
    fn new(id: MeterId) -> Self {
        Self {
            id,
            count: AtomicI64::new(0),
        }
    }

    /// The id of this counter.
    pub fn id(&self) -> &MeterId {
        &self.id
    }

    /// The amount added since the last measure.
    pub fn count(&self) -> i64 {
        self.count.load(Ordering::SeqCst)
    }

    /// Takes the accumulated count. Nothing is reported for an idle counter.
    pub fn measure(&self) -> Vec<Measurement> {
        let count = self.count.swap(0, Ordering::SeqCst);
        if count == 0 {
            Vec::new()
        } else {
            vec![Measurement::new(self.id.with_stat("count"), count as f64)]
        }
    }
}

impl Counter for LocalCounter {
    fn add(&self, delta: i64) {
        self.count.fetch_add(delta, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct TimerStats {
    count: i64,
    total_nanos: i64,
    total_of_squares: f64,
    max_nanos: i64,
}

/// A timer keeping count, total, sum of squares, and max of its durations.
#[derive(Debug)]
pub struct LocalTimer {
    id: MeterId,
    stats: Mutex<TimerStats>,
}

impl LocalTimer {
    fn new(id: MeterId) -> Self {
        Self {
            id,
            stats: Mutex::new(TimerStats::default()),
        }
    }

    /// The id of this timer.
    pub fn id(&self) -> &MeterId {
        &self.id
    }

    /// Number of durations recorded since the last measure.
    pub fn count(&self) -> i64 {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner).count
    }

    /// Sum of the durations recorded since the last measure.
    pub fn total_time(&self) -> Duration {
        let nanos = self
            .stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .total_nanos;
        Duration::from_nanos(nanos.max(0) as u64)
    }

    /// Takes the statistics and resets the timer.
    ///
    /// Times are reported in seconds: `count`, `totalTime`,
    /// `totalOfSquares` and `max`.
    pub fn measure(&self) -> Vec<Measurement> {
        let stats = std::mem::take(
            &mut *self.stats.lock().unwrap_or_else(PoisonError::into_inner),
        );
        if stats.count == 0 {
            return Vec::new();
        }
        vec![
            Measurement::new(self.id.with_stat("count"), stats.count as f64),
            Measurement::new(
                self.id.with_stat("totalTime"),
                stats.total_nanos as f64 / 1e9,
            ),
            Measurement::new(
                self.id.with_stat("totalOfSquares"),
                stats.total_of_squares / 1e18,
            ),
            Measurement::new(self.id.with_stat("max"), stats.max_nanos as f64 / 1e9),
        ]
    }
}

impl Timer for LocalTimer {
    fn record(&self, duration: Duration) {
        let nanos = duration.as_nanos().min(i64::MAX as u128) as i64;
        let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
        stats.count += 1;
        stats.total_nanos = stats.total_nanos.saturating_add(nanos);
        stats.total_of_squares += (nanos as f64) * (nanos as f64);
        stats.max_nanos = stats.max_nanos.max(nanos);
    }
}

/// A meter registered in a [`LocalRegistry`].
#[derive(Clone, Debug)]
pub enum Meter {
    /// A gauge.
    Gauge(Arc<LocalGauge>),
    /// An additive counter.
    Counter(Arc<LocalCounter>),
    /// A timer.
    Timer(Arc<LocalTimer>),
}

impl Meter {
    /// The id the meter was registered with.
    pub fn id(&self) -> &MeterId {
        match self {
            Meter::Gauge(g) => g.id(),
            Meter::Counter(c) => c.id(),
            Meter::Timer(t) => t.id(),
        }
    }

    /// Takes the current measurements of the meter, resetting it.
    pub fn measure(&self) -> Vec<Measurement> {
        match self {
            Meter::Gauge(g) => g.measure(),
            Meter::Counter(c) => c.measure(),
            Meter::Timer(t) => t.measure(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Meter::Gauge(_) => "gauge",
            Meter::Counter(_) => "counter",
            Meter::Timer(_) => "timer",
        }
    }
}

/// An in-process registry.
///
/// Meters are created on first lookup and kept for the lifetime of the
/// registry. Values accumulate until [`measurements`](Self::measurements) is
/// called, which is what an exporter would do on every publish cycle.
///
/// # Example
///
/// ```
/// use runtime_metrics::registry::{LocalRegistry, Registry};
/// use runtime_metrics::MeterId;
///
/// let registry = LocalRegistry::new().with_common_tag("nf.app", "demo");
/// registry.gauge(MeterId::new("fh.max")).set(1024.0);
///
/// let measurements = registry.measurements();
/// assert_eq!(measurements.len(), 1);
/// assert_eq!(measurements[0].value, 1024.0);
/// assert_eq!(measurements[0].id.tags["nf.app"], "demo");
/// ```
#[derive(Debug, Default)]
pub struct LocalRegistry {
    common_tags: BTreeMap<String, String>,
    meters: Mutex<BTreeMap<MeterId, Meter>>,
}

impl LocalRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tag applied to every meter created afterwards.
    #[must_use]
    pub fn with_common_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.common_tags.insert(key.into(), value.into());
        self
    }

    /// Adds tags applied to every meter created afterwards.
    #[must_use]
    pub fn with_common_tags<T, K, V>(mut self, tags: T) -> Self
    where
        T: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in tags {
            self.common_tags.insert(k.into(), v.into());
        }
        self
    }

    /// Returns all registered meters, ordered by id.
    pub fn meters(&self) -> Vec<Meter> {
        self.lock().values().cloned().collect()
    }

    /// Looks up a registered meter by name.
    pub fn meter(&self, name: &str) -> Option<Meter> {
        self.lock()
            .values()
            .find(|meter| meter.id().name == name)
            .cloned()
    }

    /// Measures every meter, resetting their state.
    pub fn measurements(&self) -> Vec<Measurement> {
        self.meters().iter().flat_map(Meter::measure).collect()
    }

    /// Measures every meter and renders the batch as JSON.
    pub fn measurements_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.measurements())
    }

    /// Returns the concrete gauge for `id`, creating it if needed.
    pub fn local_gauge(&self, id: MeterId) -> Arc<LocalGauge> {
        match self.register(id, |id| Meter::Gauge(Arc::new(LocalGauge::new(id)))) {
            Ok(Meter::Gauge(gauge)) => gauge,
            Ok(other) | Err(other) => Arc::new(LocalGauge::new(other.id().clone())),
        }
    }

    /// Returns the concrete counter for `id`, creating it if needed.
    pub fn local_counter(&self, id: MeterId) -> Arc<LocalCounter> {
        match self.register(id, |id| Meter::Counter(Arc::new(LocalCounter::new(id)))) {
            Ok(Meter::Counter(counter)) => counter,
            Ok(other) | Err(other) => Arc::new(LocalCounter::new(other.id().clone())),
        }
    }

    /// Returns the concrete timer for `id`, creating it if needed.
    pub fn local_timer(&self, id: MeterId) -> Arc<LocalTimer> {
        match self.register(id, |id| Meter::Timer(Arc::new(LocalTimer::new(id)))) {
            Ok(Meter::Timer(timer)) => timer,
            Ok(other) | Err(other) => Arc::new(LocalTimer::new(other.id().clone())),
        }
    }

    /// Gets or creates the meter for `id`.
    ///
    /// Returns `Err` with the existing meter when it was registered with a
    /// different type than `create` produces.
    fn register(
        &self,
        id: MeterId,
        create: impl FnOnce(MeterId) -> Meter,
    ) -> Result<Meter, Meter> {
        let id = id.with_tags(
            self.common_tags
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        let wanted = create(id.clone());
        let mut meters = self.lock();
        let existing = meters.entry(id).or_insert_with(|| wanted.clone());
        if existing.kind() == wanted.kind() {
            Ok(existing.clone())
        } else {
            warn!(
                "meter {} is already registered as a {}, returning a detached {}",
                existing.id(),
                existing.kind(),
                wanted.kind()
            );
            Err(existing.clone())
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<MeterId, Meter>> {
        self.meters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Registry for LocalRegistry {
    fn gauge(&self, id: MeterId) -> Arc<dyn Gauge> {
        self.local_gauge(id)
    }

    fn counter(&self, id: MeterId) -> Arc<dyn Counter> {
        self.local_counter(id)
    }

    fn timer(&self, id: MeterId) -> Arc<dyn Timer> {
        self.local_timer(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_resets_after_measure() {
        let registry = LocalRegistry::new();
        let gauge = registry.gauge(MeterId::new("mem.numLiveObjects"));

        gauge.set(5.0);
        gauge.set(7.0);
        let ms = registry.measurements();
        assert_eq!(ms.len(), 1);
        assert_eq!(ms[0].value, 7.0);
        assert_eq!(ms[0].statistic(), Some("gauge"));

        assert!(registry.measurements().is_empty());
    }

    #[test]
    fn test_counter_accumulates() {
        let registry = LocalRegistry::new();
        registry.counter(MeterId::new("gc.count")).add(2);
        registry.counter(MeterId::new("gc.count")).add(3);

        assert_eq!(registry.meters().len(), 1);
        let ms = registry.measurements();
        assert_eq!(ms.len(), 1);
        assert_eq!(ms[0].value, 5.0);
        assert!(registry.measurements().is_empty());
    }

    #[test]
    fn test_timer_statistics() {
        let registry = LocalRegistry::new();
        let timer = registry.local_timer(MeterId::new("gc.pauseTime"));
        timer.record(Duration::from_millis(1));
        timer.record(Duration::from_millis(3));
        assert_eq!(timer.count(), 2);
        assert_eq!(timer.total_time(), Duration::from_millis(4));

        let ms = timer.measure();
        let get = |stat: &str| {
            ms.iter()
                .find(|m| m.statistic() == Some(stat))
                .map(|m| m.value)
                .unwrap()
        };
        assert_eq!(ms.len(), 4);
        assert_eq!(get("count"), 2.0);
        assert_eq!(get("totalTime"), 0.004);
        assert_eq!(get("totalOfSquares"), 10e12 / 1e18);
        assert_eq!(get("max"), 0.003);

        assert_eq!(timer.count(), 0);
        assert!(timer.measure().is_empty());
    }

    #[test]
    fn test_timer_drops_negative_nanos() {
        let registry = LocalRegistry::new();
        let timer = registry.local_timer(MeterId::new("gc.pauseTime"));
        timer.record_nanos(-6);
        timer.record_nanos(i64::MIN);
        assert_eq!(timer.count(), 0);

        timer.record_nanos(2_000_000);
        assert_eq!(timer.count(), 1);
        assert_eq!(timer.total_time(), Duration::from_millis(2));
    }

    #[test]
    fn test_common_tags() {
        let registry = LocalRegistry::new()
            .with_common_tags([("nf.app", "test"), ("nf.region", "us-west-1")]);
        registry.gauge(MeterId::new("fh.max")).set(1.0);

        let meter = registry.meter("fh.max").unwrap();
        assert_eq!(meter.id().tags.len(), 2);
        assert_eq!(meter.id().tags["nf.region"], "us-west-1");
    }

    #[test]
    fn test_type_conflict_returns_detached_meter() {
        let registry = LocalRegistry::new();
        registry.gauge(MeterId::new("gc.count")).set(1.0);
        registry.counter(MeterId::new("gc.count")).add(10);

        assert_eq!(registry.meters().len(), 1);
        assert!(matches!(registry.meter("gc.count"), Some(Meter::Gauge(_))));
        assert_eq!(registry.measurements().len(), 1);
    }
}

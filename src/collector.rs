//! Collector trait.

/// A routine run on every sampling tick.
///
/// Collectors read whatever they need and push the results into the meters
/// they own. They are driven by a single [`PeriodicSampler`] thread, so
/// `collect` takes `&mut self` and may keep state between ticks.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use runtime_metrics::registry::{Gauge, LocalRegistry, Registry};
/// use runtime_metrics::{Collector, MeterId};
///
/// struct QueueDepthCollector {
///     depth: Arc<dyn Gauge>,
/// }
///
/// impl Collector for QueueDepthCollector {
///     fn collect(&mut self) {
///         self.depth.set(3.0);
///     }
///
///     fn name(&self) -> &'static str {
///         "queue"
///     }
/// }
///
/// let registry = LocalRegistry::new();
/// let mut collector = QueueDepthCollector {
///     depth: registry.gauge(MeterId::new("queue.depth")),
/// };
/// collector.collect();
/// assert_eq!(registry.measurements()[0].value, 3.0);
/// ```
///
/// [`PeriodicSampler`]: crate::PeriodicSampler
pub trait Collector: Send + 'static {
    /// Reads the current values and publishes them.
    ///
    /// This is called once per tick and should not block for long.
    fn collect(&mut self);

    /// Name of this collector for logging and thread names.
    fn name(&self) -> &'static str;
}

impl<C: Collector + ?Sized> Collector for Box<C> {
    fn collect(&mut self) {
        (**self).collect()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

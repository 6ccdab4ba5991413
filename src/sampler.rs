//! Background sampling of collectors.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::info;

use crate::collector::Collector;
use crate::error::Error;

/// How often samplers run their collectors.
pub const SAMPLING_INTERVAL: Duration = Duration::from_secs(30);

type Shutdown = Arc<(Mutex<bool>, Condvar)>;

/// Runs a set of collectors on a background thread at a fixed rate.
///
/// Ticks are aligned to the moment the sampler was created. A collection
/// pass that overruns the period delays the next tick but never queues up
/// several: one late tick runs right away and the other missed ones are
/// dropped.
pub struct PeriodicSampler {
    name: &'static str,
    collectors: Vec<Box<dyn Collector>>,
    origin: Instant,
    period: Duration,
}

impl PeriodicSampler {
    /// Creates a sampler named after `collector`.
    pub fn new<C: Collector>(collector: C) -> Self {
        Self {
            name: collector.name(),
            collectors: vec![Box::new(collector)],
            origin: Instant::now(),
            period: SAMPLING_INTERVAL,
        }
    }

    /// Adds another collector, run after the existing ones on every tick.
    #[must_use]
    pub fn add_collector<C: Collector>(mut self, collector: C) -> Self {
        self.collectors.push(Box::new(collector));
        self
    }

    #[cfg(test)]
    pub(crate) fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// The name of the sampler.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Spawns the sampling thread.
    ///
    /// The first tick happens one period after the sampler was created.
    pub fn start(self) -> Result<SamplerHandle, Error> {
        #[allow(clippy::mutex_atomic)]
        let shutdown: Shutdown = Arc::new((Mutex::new(false), Condvar::new()));
        let ticks = Arc::new(AtomicU64::new(0));

        let name = self.name;
        let worker_shutdown = shutdown.clone();
        let worker_ticks = ticks.clone();
        let worker = std::thread::Builder::new()
            .name(format!("runtime-metrics-{name}"))
            .spawn(move || self.run(&worker_shutdown, &worker_ticks))
            .map_err(|source| Error::Spawn { name, source })?;

        info!("[Sampler({name})] started");
        Ok(SamplerHandle {
            name,
            shutdown,
            ticks,
            worker: Some(worker),
        })
    }

    fn run(mut self, shutdown: &Shutdown, ticks: &AtomicU64) {
        let (lock, cvar) = shutdown.as_ref();
        let mut stopped = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = self.origin + self.period;
        loop {
            if *stopped {
                return;
            }
            let now = Instant::now();
            if now < next {
                stopped = cvar
                    .wait_timeout(stopped, next - now)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0;
                continue;
            }

            // collectors run without holding the lock so stop is never blocked
            drop(stopped);
            for collector in &mut self.collectors {
                collector.collect();
            }
            ticks.fetch_add(1, Ordering::SeqCst);
            next = next_deadline(next, self.period, Instant::now());

            stopped = lock.lock().unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl fmt::Debug for PeriodicSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.collectors.iter().map(|c| c.name()).collect();
        f.debug_struct("PeriodicSampler")
            .field("name", &self.name)
            .field("collectors", &names)
            .field("period", &self.period)
            .finish()
    }
}

/// Computes the tick after the one at `fired`.
///
/// When `now` is already past one or more later boundaries, returns the
/// latest of them so that exactly one late tick runs.
fn next_deadline(fired: Instant, period: Duration, now: Instant) -> Instant {
    let next = fired + period;
    let behind = now.saturating_duration_since(next);
    let skipped = (behind.as_nanos() / period.as_nanos().max(1)) as u32;
    next + period * skipped
}

/// Controls a started [`PeriodicSampler`].
///
/// Dropping the handle stops the sampler. Use [`detach`](Self::detach) to
/// keep it running for the rest of the process.
pub struct SamplerHandle {
    name: &'static str,
    shutdown: Shutdown,
    ticks: Arc<AtomicU64>,
    worker: Option<JoinHandle<()>>,
}

impl SamplerHandle {
    /// The name of the sampler.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of completed ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Signals the sampler to stop and waits for the thread to exit.
    ///
    /// A tick that is in progress is finished first.
    pub fn stop(mut self) {
        self.shutdown();
    }

    /// Lets the sampler run until the process exits.
    pub fn detach(mut self) {
        self.worker.take();
    }

    fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let (lock, cvar) = self.shutdown.as_ref();
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_one();
        worker.join().ok();
        info!("[Sampler({})] stopped after {} ticks", self.name, self.ticks());
    }
}

impl fmt::Debug for SamplerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SamplerHandle")
            .field("name", &self.name)
            .field("ticks", &self.ticks())
            .field("running", &self.worker.is_some())
            .finish()
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

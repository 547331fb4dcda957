//! Fixed-interval polling
//!
//! [`PollScheduler`] issues one fetch per registered definition on every tick and feeds the
//! results into a [`SeriesRegistry`].
//!
//! ## Timing
//!
//! Ticks sit on a fixed grid measured from [`start`](PollScheduler::start). A slow batch never
//! pushes later ticks back; if the loop itself falls behind, missed ticks are skipped rather
//! than replayed in a burst.
//!
//! ## Backpressure
//!
//! Each definition has at most one fetch outstanding. When a tick comes due while the previous
//! fetch for a label is still running, that label sits the tick out and the skip is counted in
//! [`PollState`].
//!
//! ## Failures
//!
//! A failed sample bumps the label's consecutive-failure count. Reaching the threshold emits a
//! single [`DegradedMetricWarning`]; polling carries on, and the next success resets the count
//! and emits [`RegistryEvent::Recovered`](crate::registry::RegistryEvent::Recovered).
//!
//! ## Stopping
//!
//! After [`stop`](PollScheduler::stop) returns no new fetch is issued and no result reaches the
//! registry. Fetches already running are left to finish and their samples are discarded.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use horizon_poller::core::MetricDefinition;
//! use horizon_poller::registry::SeriesRegistry;
//! use horizon_poller::scheduler::PollScheduler;
//! use horizon_poller::source::{BridgeSource, JolokiaBridge};
//!
//! #[tokio::main]
//! async fn main() -> horizon_poller::Result<()> {
//!     let bridge = JolokiaBridge::new(
//!         "http://localhost:8080/jolokia",
//!         "mapcode:name=SystemMetrics",
//!         Duration::from_secs(5),
//!     )?;
//!     let registry = Arc::new(SeriesRegistry::new());
//!     let scheduler = PollScheduler::new(
//!         Arc::new(BridgeSource::new(Arc::new(bridge))),
//!         Arc::clone(&registry),
//!         Duration::from_secs(1),
//!         5,
//!     )?;
//!
//!     scheduler.register(MetricDefinition::new("WarningsAndErrors", "lastMinute/sum", "Errors")?)?;
//!     scheduler.start()?;
//!     tokio::time::sleep(Duration::from_secs(10)).await;
//!     scheduler.stop();
//!
//!     println!("{:?}", registry.snapshot());
//!     Ok(())
//! }
//! ```

mod state;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::core::{MetricDefinition, Sample};
use crate::error::{Error, Result};
use crate::registry::{DegradedMetricWarning, SeriesRegistry};
use crate::source::MetricSource;

pub use state::{PollState, SeriesState};
use state::Transition;

#[derive(Debug, Default)]
struct Gate {
    running: bool,
    /// Bumped on every start so results from an earlier run are recognisable
    epoch: u64,
}

struct Inner {
    source: Arc<dyn MetricSource>,
    registry: Arc<SeriesRegistry>,
    tick_interval: Duration,
    failure_threshold: u32,
    definitions: Mutex<Vec<MetricDefinition>>,
    state: Mutex<PollState>,
    gate: Mutex<Gate>,
}

impl Inner {
    fn is_current(&self, epoch: u64) -> bool {
        let gate = self.gate.lock();
        gate.running && gate.epoch == epoch
    }

    fn tick(self: &Arc<Self>, epoch: u64) {
        // Held while fetches are spawned so a concurrent stop() cannot interleave.
        let gate = self.gate.lock();
        if !gate.running || gate.epoch != epoch {
            return;
        }

        let definitions = self.definitions.lock().clone();
        let mut state = self.state.lock();
        let tick = state.begin_tick();

        for definition in definitions {
            let Some(generation) = state.try_begin_fetch(definition.label()) else {
                debug!(tick, label = definition.label(), "previous fetch still outstanding, tick skipped");
                continue;
            };
            tokio::spawn(fetch_one(Arc::clone(self), epoch, generation, definition));
        }
    }

    fn deliver(&self, epoch: u64, generation: u64, sample: Sample) {
        // Held through the registry update; stop() waits on it.
        let gate = self.gate.lock();
        if !gate.running || gate.epoch != epoch {
            debug!(label = %sample.label, "scheduler stopped, discarding sample");
            return;
        }

        let transition = {
            let mut state = self.state.lock();
            if !state.is_current(&sample.label, generation) {
                debug!(label = %sample.label, generation, "registration replaced, discarding sample");
                return;
            }
            match sample.value {
                Some(_) => state.record_success(&sample.label, sample.timestamp),
                None => state.record_failure(&sample.label, self.failure_threshold),
            }
        };

        let label = sample.label.clone();
        let timestamp = sample.timestamp;
        let last_error = sample.error.clone();
        self.registry.update(sample);

        match transition {
            Transition::Degraded(consecutive_failures) => {
                warn!(%label, consecutive_failures, error = ?last_error, "metric degraded");
                self.registry.notify_degraded(DegradedMetricWarning {
                    label,
                    consecutive_failures,
                    last_error,
                    timestamp,
                });
            },
            Transition::Recovered => {
                info!(%label, "metric recovered");
                self.registry.notify_recovered(label);
            },
            Transition::None => {},
        }
    }
}

async fn fetch_one(inner: Arc<Inner>, epoch: u64, generation: u64, definition: MetricDefinition) {
    let inner = scopeguard::guard(inner, |inner| inner.state.lock().finish_fetch(definition.label(), generation));

    // The task may first run after a stop; skip the round trip then.
    if !inner.is_current(epoch) {
        return;
    }

    let sample = inner.source.fetch(&definition).await;
    if sample.label != definition.label() {
        warn!(expected = definition.label(), got = %sample.label, "source returned a sample for another label");
        return;
    }
    inner.deliver(epoch, generation, sample);
}

/// Drives periodic fetches for a set of metric definitions.
///
/// Registry subscribers are called from inside the scheduler's delivery path and must not call
/// back into the scheduler.
pub struct PollScheduler {
    inner: Arc<Inner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for PollScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // One lock at a time; tick() holds gate while taking definitions.
        let definitions = self.inner.definitions.lock().len();
        let running = self.is_running();
        f.debug_struct("PollScheduler")
            .field("tick_interval", &self.inner.tick_interval)
            .field("failure_threshold", &self.inner.failure_threshold)
            .field("definitions", &definitions)
            .field("running", &running)
            .finish()
    }
}

impl PollScheduler {
    pub fn new(
        source: Arc<dyn MetricSource>,
        registry: Arc<SeriesRegistry>,
        tick_interval: Duration,
        failure_threshold: u32,
    ) -> Result<Self> {
        if tick_interval.is_zero() {
            return Err(Error::config("tick interval must be greater than zero"));
        }
        if failure_threshold == 0 {
            return Err(Error::config("failure threshold must be at least 1"));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                source,
                registry,
                tick_interval,
                failure_threshold,
                definitions: Mutex::new(Vec::new()),
                state: Mutex::new(PollState::default()),
                gate: Mutex::new(Gate::default()),
            }),
            task: Mutex::new(None),
        })
    }

    /// Builds a scheduler with the config's cadence and registers all of its definitions.
    pub fn from_config(
        config: &MonitorConfig,
        source: Arc<dyn MetricSource>,
        registry: Arc<SeriesRegistry>,
    ) -> Result<Self> {
        let scheduler = Self::new(source, registry, config.tick_interval(), config.failure_threshold)?;
        for definition in config.definitions()? {
            scheduler.register(definition)?;
        }
        Ok(scheduler)
    }

    /// Adds a definition; it is polled from the next tick on.
    pub fn register(&self, definition: MetricDefinition) -> Result<()> {
        let mut definitions = self.inner.definitions.lock();
        if definitions.iter().any(|d| d.label() == definition.label()) {
            return Err(Error::DuplicateLabel(definition.label().to_string()));
        }

        self.inner.state.lock().track(definition.label());
        debug!(label = definition.label(), counter = definition.name(), path = definition.window_path(), "registered");
        definitions.push(definition);
        Ok(())
    }

    /// Removes a definition and its cached sample. Returns `None` if the label was unknown.
    pub fn unregister(&self, label: &str) -> Option<MetricDefinition> {
        let mut definitions = self.inner.definitions.lock();
        let position = definitions.iter().position(|d| d.label() == label)?;
        let definition = definitions.remove(position);

        self.inner.state.lock().forget(label);
        self.inner.registry.remove(label);
        debug!(label, "unregistered");
        Some(definition)
    }

    /// Starts the tick loop. Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<()> {
        let mut task = self.task.lock();
        if task.is_some() {
            return Err(Error::scheduler("scheduler is already running"));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::scheduler("start() must be called from within a tokio runtime"))?;

        let epoch = {
            let mut gate = self.inner.gate.lock();
            gate.running = true;
            gate.epoch += 1;
            gate.epoch
        };

        let inner = Arc::clone(&self.inner);
        *task = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(inner.tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if !inner.is_current(epoch) {
                    break;
                }
                inner.tick(epoch);
            }
        }));

        info!(
            interval_ms = self.inner.tick_interval.as_millis() as u64,
            definitions = self.inner.definitions.lock().len(),
            "poll scheduler started"
        );
        Ok(())
    }

    /// Halts the tick loop. Safe to call repeatedly.
    pub fn stop(&self) {
        {
            let mut gate = self.inner.gate.lock();
            if !gate.running {
                return;
            }
            gate.running = false;
        }
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        info!(ticks = self.inner.state.lock().tick_count, "poll scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.inner.gate.lock().running
    }

    pub fn definitions(&self) -> Vec<MetricDefinition> {
        self.inner.definitions.lock().clone()
    }

    pub fn poll_state(&self) -> PollState {
        self.inner.state.lock().clone()
    }

    pub fn tick_interval(&self) -> Duration {
        self.inner.tick_interval
    }

    pub fn failure_threshold(&self) -> u32 {
        self.inner.failure_threshold
    }

    pub fn registry(&self) -> &Arc<SeriesRegistry> {
        &self.inner.registry
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

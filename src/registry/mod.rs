//! Latest-value cache and fan-out to renderers
//!
//! [`SeriesRegistry`] keeps the newest [`Sample`] per label and pushes every change to its
//! subscribers, synchronously and in subscription order. It is not a history buffer;
//! renderers that draw a time axis accumulate history themselves.
//!
//! A new subscriber first receives a [`RegistryEvent::Snapshot`] of the current state and
//! then the live stream. Both happen under the same lock as updates, so nothing can slip in
//! between the snapshot and the first streamed event.
//!
//! # Examples
//!
//! ```rust
//! use horizon_poller::core::Sample;
//! use horizon_poller::registry::{RegistryEvent, SeriesRegistry};
//!
//! let registry = SeriesRegistry::new();
//! registry.update(Sample::ok("Requests / Last Minute", 1_000, 5.0));
//!
//! let handle = registry.subscribe(|event| match event {
//!     RegistryEvent::Snapshot(state) => println!("initial state: {} series", state.len()),
//!     RegistryEvent::Sample(sample) => println!("{} = {:?}", sample.label, sample.value),
//!     other => println!("{:?}", other),
//! });
//!
//! registry.update(Sample::ok("Requests / Last Minute", 2_000, 7.0));
//! registry.unsubscribe(handle);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::core::Sample;

/// Raised when a label has failed `consecutive_failures` fetches in a row.
///
/// Informational only: polling continues and the next success clears the condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradedMetricWarning {
    pub label: String,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
}

/// What subscribers receive
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    /// Current state, delivered once when subscribing
    Snapshot(BTreeMap<String, Sample>),
    Sample(Sample),
    Degraded(DegradedMetricWarning),
    /// A degraded label produced a value again
    Recovered { label: String },
}

/// Returned by [`SeriesRegistry::subscribe`]; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

type Callback = Arc<dyn Fn(&RegistryEvent) + Send + Sync>;

#[derive(Default)]
struct RegistryState {
    latest: BTreeMap<String, Sample>,
    /// Newest timestamp seen per label, failed samples included
    watermarks: HashMap<String, u64>,
    subscribers: Vec<(SubscriptionHandle, Callback)>,
    next_id: u64,
}

impl RegistryState {
    fn broadcast(&self, event: &RegistryEvent) {
        for (_, callback) in &self.subscribers {
            callback(event);
        }
    }
}

/// Latest-value cache with synchronous fan-out.
///
/// Callbacks run while the registry lock is held and must not call back into the registry.
#[derive(Default)]
pub struct SeriesRegistry {
    state: Mutex<RegistryState>,
}

impl std::fmt::Debug for SeriesRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SeriesRegistry")
            .field("labels", &state.latest.keys().collect::<Vec<_>>())
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}

impl SeriesRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a sample and notifies subscribers.
    ///
    /// A sample older than the newest one already seen for its label is dropped and `false`
    /// is returned. A failed sample is forwarded but leaves the cached value untouched.
    pub fn update(&self, sample: Sample) -> bool {
        let mut state = self.state.lock();

        if let Some(&newest) = state.watermarks.get(&sample.label) {
            if sample.timestamp < newest {
                debug!(label = %sample.label, timestamp = sample.timestamp, newest, "dropping out-of-order sample");
                return false;
            }
        }
        state.watermarks.insert(sample.label.clone(), sample.timestamp);

        if sample.value.is_some() {
            state.latest.insert(sample.label.clone(), sample.clone());
        }

        state.broadcast(&RegistryEvent::Sample(sample));
        true
    }

    pub fn notify_degraded(&self, warning: DegradedMetricWarning) {
        self.state.lock().broadcast(&RegistryEvent::Degraded(warning));
    }

    pub fn notify_recovered(&self, label: impl Into<String>) {
        self.state.lock().broadcast(&RegistryEvent::Recovered { label: label.into() });
    }

    /// Registers a callback. It receives a snapshot immediately, then every later event.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&RegistryEvent) + Send + Sync + 'static,
    {
        let mut state = self.state.lock();
        let handle = SubscriptionHandle(state.next_id);
        state.next_id += 1;

        callback(&RegistryEvent::Snapshot(state.latest.clone()));
        state.subscribers.push((handle, Arc::new(callback)));
        handle
    }

    /// Same stream as [`subscribe`](Self::subscribe), delivered over a channel.
    pub fn subscribe_channel(&self) -> (SubscriptionHandle, mpsc::UnboundedReceiver<RegistryEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self.subscribe(move |event| {
            // A dropped receiver just stops listening; unsubscribe cleans up the slot.
            let _ = tx.send(event.clone());
        });
        (handle, rx)
    }

    /// Removes a subscriber. Returns whether it was still registered.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut state = self.state.lock();
        let before = state.subscribers.len();
        state.subscribers.retain(|(h, _)| *h != handle);
        state.subscribers.len() != before
    }

    pub fn snapshot(&self) -> BTreeMap<String, Sample> {
        self.state.lock().latest.clone()
    }

    pub fn latest(&self, label: &str) -> Option<Sample> {
        self.state.lock().latest.get(label).cloned()
    }

    /// Forgets everything cached for a label.
    pub fn remove(&self, label: &str) -> Option<Sample> {
        let mut state = self.state.lock();
        state.watermarks.remove(label);
        state.latest.remove(label)
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }
}

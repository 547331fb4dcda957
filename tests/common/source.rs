use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use horizon_poller::core::{MetricDefinition, Sample};
use horizon_poller::source::MetricSource;
use parking_lot::Mutex;
use tokio::time::Instant;

#[derive(Default)]
struct Script {
    values: Vec<Option<f64>>,
    latency: Duration,
    calls: usize,
}

/// Replays per-label values; the last entry repeats once the script runs out.
///
/// Timestamps are virtual milliseconds since construction, taken when the fetch completes.
pub struct ScriptedSource {
    origin: Instant,
    scripts: Mutex<HashMap<String, Script>>,
    total_calls: AtomicUsize,
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self { origin: Instant::now(), scripts: Mutex::new(HashMap::new()), total_calls: AtomicUsize::new(0) }
    }

    pub fn with_values(self, label: &str, values: Vec<Option<f64>>) -> Self {
        self.scripts.lock().entry(label.to_string()).or_default().values = values;
        self
    }

    pub fn with_latency(self, label: &str, latency: Duration) -> Self {
        self.scripts.lock().entry(label.to_string()).or_default().latency = latency;
        self
    }

    pub fn calls(&self, label: &str) -> usize {
        self.scripts.lock().get(label).map(|s| s.calls).unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricSource for ScriptedSource {
    async fn fetch(&self, definition: &MetricDefinition) -> Sample {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        let (value, latency) = {
            let mut scripts = self.scripts.lock();
            let script = scripts.entry(definition.label().to_string()).or_default();
            let value = script.values.get(script.calls).or(script.values.last()).copied().flatten();
            script.calls += 1;
            (value, script.latency)
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let timestamp = self.origin.elapsed().as_millis() as u64;
        match value {
            Some(v) => Sample::ok(definition.label(), timestamp, v),
            None => Sample::failed(definition.label(), timestamp, "scripted failure"),
        }
    }
}

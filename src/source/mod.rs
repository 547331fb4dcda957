//! Metric sources
//!
//! A [`MetricSource`] turns a [`MetricDefinition`] into a [`Sample`]. It never returns an
//! error: anything that goes wrong on the way to the bridge becomes a sample without a value
//! and with the failure reason attached. Retrying is the scheduler's job, so a source issues
//! exactly one round trip per call.
//!
//! [`BridgeSource`] adapts any [`BridgeTransport`] (the raw `(counter, path) -> number` read)
//! into a source. [`JolokiaBridge`] is the HTTP transport.

pub mod jolokia;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::core::{now_millis, MetricDefinition, Sample};
use crate::error::Result;

pub use jolokia::JolokiaBridge;

#[cfg(test)]
use mockall::automock;

/// Fetches the current value of one series
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Reads the definition's counter once. Failures come back as a sample with `value = None`.
    async fn fetch(&self, definition: &MetricDefinition) -> Sample;

    /// Reads every definition concurrently, returning samples in input order.
    async fn fetch_all(&self, definitions: &[MetricDefinition]) -> Vec<Sample> {
        futures::future::join_all(definitions.iter().map(|definition| self.fetch(definition))).await
    }
}

/// Raw read against the metrics bridge
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BridgeTransport: Send + Sync {
    async fn read(&self, counter: &str, window_path: &str) -> Result<f64>;
}

/// [`MetricSource`] backed by a [`BridgeTransport`]
#[derive(Debug)]
pub struct BridgeSource<T> {
    transport: Arc<T>,
}

impl<T: BridgeTransport> BridgeSource<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }
}

#[async_trait]
impl<T: BridgeTransport> MetricSource for BridgeSource<T> {
    async fn fetch(&self, definition: &MetricDefinition) -> Sample {
        let result = self.transport.read(definition.name(), definition.window_path()).await;
        let timestamp = now_millis();

        match result {
            Ok(value) if value.is_finite() => Sample::ok(definition.label(), timestamp, value),
            Ok(value) => {
                debug!(label = definition.label(), value, "bridge returned a non-finite value");
                Sample::failed(definition.label(), timestamp, format!("non-finite value {}", value))
            },
            Err(e) => {
                debug!(
                    label = definition.label(),
                    counter = definition.name(),
                    path = definition.window_path(),
                    error = %e,
                    "fetch failed"
                );
                Sample::failed(definition.label(), timestamp, e.to_string())
            },
        }
    }
}

//! Dashboard configuration
//!
//! A [`MonitorConfig`] carries everything needed to poll one bridge: the endpoint, the MBean
//! holding the counters, the tick cadence and the set of series to draw. Two dashboards that
//! differ only in endpoint and counters are two config values.
//!
//! # Examples
//!
//! ```no_run
//! use horizon_poller::config::{MonitorConfig, Panel};
//! use horizon_poller::core::Aggregate;
//!
//! let config = MonitorConfig::new("http://localhost:8080/jolokia")
//!     .with_tick_interval_ms(1000)
//!     .with_panel(Panel::new("Warnings and Errors", "WarningsAndErrors", Aggregate::Sum));
//! config.validate().unwrap();
//! assert_eq!(config.definitions().unwrap().len(), 5);
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::constants::{
    DEFAULT_FAILURE_THRESHOLD, DEFAULT_MBEAN, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_TICK_INTERVAL_MS,
    MAX_TICK_INTERVAL_MS, MIN_TICK_INTERVAL_MS,
};
use crate::core::{Aggregate, MetricDefinition, Window};
use crate::error::{Error, Result};

/// One chart: a counter polled over every standard window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Panel {
    pub title: String,
    pub counter: String,
    pub aggregate: Aggregate,
}

impl Panel {
    pub fn new(title: impl Into<String>, counter: impl Into<String>, aggregate: Aggregate) -> Self {
        Self { title: title.into(), counter: counter.into(), aggregate }
    }

    /// Expands to one definition per [`Window`], labelled `"<title> / <window>"`.
    pub fn definitions(&self) -> Result<Vec<MetricDefinition>> {
        Window::ALL
            .iter()
            .map(|window| {
                MetricDefinition::windowed(
                    self.counter.clone(),
                    *window,
                    self.aggregate,
                    format!("{} / {}", self.title, window.display_name()),
                )
            })
            .collect()
    }
}

/// Flat configuration for one bridge endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub endpoint_url: String,
    pub mbean: String,
    pub tick_interval_ms: u64,
    pub failure_threshold: u32,
    pub request_timeout_ms: u64,
    pub metrics: Vec<MetricDefinition>,
    pub panels: Vec<Panel>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            endpoint_url: String::new(),
            mbean: DEFAULT_MBEAN.to_string(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            metrics: Vec::new(),
            panels: Vec::new(),
        }
    }
}

impl MonitorConfig {
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self { endpoint_url: endpoint_url.into(), ..Self::default() }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    pub fn with_mbean(mut self, mbean: impl Into<String>) -> Self {
        self.mbean = mbean.into();
        self
    }

    pub fn with_tick_interval_ms(mut self, interval_ms: u64) -> Self {
        self.tick_interval_ms = interval_ms;
        self
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    pub fn with_metric(mut self, definition: MetricDefinition) -> Self {
        self.metrics.push(definition);
        self
    }

    pub fn with_panel(mut self, panel: Panel) -> Self {
        self.panels.push(panel);
        self
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Explicit metrics first, then every panel's expansion, in declaration order.
    pub fn definitions(&self) -> Result<Vec<MetricDefinition>> {
        let mut definitions = self.metrics.clone();
        for panel in &self.panels {
            definitions.extend(panel.definitions()?);
        }
        Ok(definitions)
    }

    pub fn validate(&self) -> Result<()> {
        let endpoint = self.endpoint_url.trim();
        if endpoint.is_empty() {
            return Err(Error::config("endpoint_url must not be empty"));
        }
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(Error::config(format!("endpoint_url must be an http(s) URL, got '{}'", endpoint)));
        }
        if self.mbean.trim().is_empty() {
            return Err(Error::config("mbean must not be empty"));
        }
        if !(MIN_TICK_INTERVAL_MS..=MAX_TICK_INTERVAL_MS).contains(&self.tick_interval_ms) {
            return Err(Error::config(format!(
                "tick_interval_ms must be between {} and {}, got {}",
                MIN_TICK_INTERVAL_MS, MAX_TICK_INTERVAL_MS, self.tick_interval_ms
            )));
        }
        if self.failure_threshold == 0 {
            return Err(Error::config("failure_threshold must be at least 1"));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::config("request_timeout_ms must be greater than zero"));
        }

        let mut labels = HashSet::new();
        for definition in self.definitions()? {
            if !labels.insert(definition.label().to_string()) {
                return Err(Error::DuplicateLabel(definition.label().to_string()));
            }
        }
        Ok(())
    }
}

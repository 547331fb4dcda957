use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Milliseconds since the Unix epoch, saturating at zero for clocks set before 1970.
pub fn now_millis() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

/// Aggregation period a bridge counter is summarised over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Window {
    LastMinute,
    LastHour,
    LastDay,
    LastWeek,
    LastMonth,
}

impl Window {
    /// All windows, shortest first.
    pub const ALL: [Window; 5] =
        [Window::LastMinute, Window::LastHour, Window::LastDay, Window::LastWeek, Window::LastMonth];

    /// First segment of the attribute path, e.g. `lastMinute`
    pub fn path_segment(&self) -> &'static str {
        match self {
            Window::LastMinute => "lastMinute",
            Window::LastHour => "lastHour",
            Window::LastDay => "lastDay",
            Window::LastWeek => "lastWeek",
            Window::LastMonth => "lastMonth",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Window::LastMinute => "Last Minute",
            Window::LastHour => "Last Hour",
            Window::LastDay => "Last Day",
            Window::LastWeek => "Last Week",
            Window::LastMonth => "Last Month",
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Statistic the bridge computes over a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aggregate {
    #[serde(rename = "sum")]
    Sum,
    #[serde(rename = "avg")]
    Avg,
    #[serde(rename = "stdDev")]
    StdDev,
    #[serde(rename = "min")]
    Min,
    #[serde(rename = "max")]
    Max,
}

impl Aggregate {
    pub fn path_segment(&self) -> &'static str {
        match self {
            Aggregate::Sum => "sum",
            Aggregate::Avg => "avg",
            Aggregate::StdDev => "stdDev",
            Aggregate::Min => "min",
            Aggregate::Max => "max",
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// One polled series: a bridge counter read at a window path, shown under a label.
///
/// Definitions are immutable once built. Replacing one means unregistering the old
/// label and registering a new definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDefinition")]
pub struct MetricDefinition {
    name: String,
    window_path: String,
    label: String,
}

#[derive(Deserialize)]
struct RawDefinition {
    name: String,
    window_path: String,
    label: String,
}

impl TryFrom<RawDefinition> for MetricDefinition {
    type Error = Error;

    fn try_from(raw: RawDefinition) -> Result<Self> {
        MetricDefinition::new(raw.name, raw.window_path, raw.label)
    }
}

impl MetricDefinition {
    /// Builds a definition, rejecting empty fields.
    ///
    /// The window path is not checked against the bridge here; an unknown path
    /// shows up later as failed samples.
    pub fn new(name: impl Into<String>, window_path: impl Into<String>, label: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let window_path = window_path.into();
        let label = label.into();

        if name.trim().is_empty() {
            return Err(Error::invalid_definition("counter name must not be empty"));
        }
        if window_path.trim().is_empty() {
            return Err(Error::invalid_definition(format!("window path for '{}' must not be empty", name)));
        }
        if label.trim().is_empty() {
            return Err(Error::invalid_definition(format!("label for '{}' must not be empty", name)));
        }

        Ok(Self { name, window_path, label })
    }

    /// Definition for `<window>/<aggregate>` of a counter
    pub fn windowed(
        name: impl Into<String>,
        window: Window,
        aggregate: Aggregate,
        label: impl Into<String>,
    ) -> Result<Self> {
        Self::new(name, format!("{}/{}", window.path_segment(), aggregate.path_segment()), label)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn window_path(&self) -> &str {
        &self.window_path
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// A single reading for a label.
///
/// `value` is `None` when the fetch failed; `error` then carries the reason. Consumers
/// must treat a missing value as "no update", never as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub label: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Sample {
    pub fn ok(label: impl Into<String>, timestamp: u64, value: f64) -> Self {
        Self { label: label.into(), timestamp, value: Some(value), error: None }
    }

    pub fn failed(label: impl Into<String>, timestamp: u64, reason: impl Into<String>) -> Self {
        Self { label: label.into(), timestamp, value: None, error: Some(reason.into()) }
    }

    pub fn is_failure(&self) -> bool {
        self.value.is_none()
    }
}

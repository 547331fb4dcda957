use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::MonitorConfig;
use crate::core::constants::{HEAP_MEMORY_ATTRIBUTE, HEAP_MEMORY_USED_PATH, MEMORY_MBEAN};
use crate::error::{Error, Result};
use crate::source::BridgeTransport;

/// Body of a bridge `read` request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub mbean: &'a str,
    pub attribute: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<&'a str>,
}

impl<'a> ReadRequest<'a> {
    pub fn new(mbean: &'a str, attribute: &'a str, path: Option<&'a str>) -> Self {
        Self { kind: "read", mbean, attribute, path: path.filter(|p| !p.is_empty()) }
    }
}

/// Bridge reply. The HTTP status is usually 200; the outcome is in `status`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadResponse {
    pub status: u16,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_type: Option<String>,
}

impl ReadResponse {
    /// Extracts a numeric value, accepting numbers and numeric strings.
    pub fn into_number(self) -> Result<f64> {
        if self.status != 200 {
            let message = match (self.error, self.error_type) {
                (Some(error), _) => error,
                (None, Some(error_type)) => error_type,
                (None, None) => "no error message".to_string(),
            };
            return Err(Error::bridge(self.status, message));
        }

        match self.value {
            Some(serde_json::Value::Number(n)) => {
                n.as_f64().ok_or_else(|| Error::invalid_response(format!("number out of range: {}", n)))
            },
            Some(serde_json::Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| Error::invalid_response(format!("value is not numeric: '{}'", s))),
            Some(other) => Err(Error::invalid_response(format!("value is not numeric: {}", other))),
            None => Err(Error::invalid_response("response has no value")),
        }
    }
}

/// HTTP transport for a JMX bridge speaking the Jolokia read protocol
#[derive(Debug, Clone)]
pub struct JolokiaBridge {
    client: reqwest::Client,
    endpoint: String,
    mbean: String,
}

impl JolokiaBridge {
    pub fn new(endpoint: impl Into<String>, mbean: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint: endpoint.into(), mbean: mbean.into() })
    }

    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        Self::new(config.endpoint_url.clone(), config.mbean.clone(), config.request_timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn mbean(&self) -> &str {
        &self.mbean
    }

    /// Reads one numeric attribute (optionally at an inner path) of any MBean.
    pub async fn read_attribute(&self, mbean: &str, attribute: &str, path: Option<&str>) -> Result<f64> {
        let request = ReadRequest::new(mbean, attribute, path);
        trace!(endpoint = %self.endpoint, ?request, "bridge read");

        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let http_status = response.status();
        if !http_status.is_success() {
            return Err(Error::bridge(http_status.as_u16(), format!("HTTP {}", http_status)));
        }

        let body: ReadResponse = response.json().await?;
        body.into_number()
    }

    /// Heap bytes in use, as shown in the dashboard header.
    pub async fn heap_memory_used(&self) -> Result<f64> {
        self.read_attribute(MEMORY_MBEAN, HEAP_MEMORY_ATTRIBUTE, Some(HEAP_MEMORY_USED_PATH)).await
    }
}

#[async_trait]
impl BridgeTransport for JolokiaBridge {
    async fn read(&self, counter: &str, window_path: &str) -> Result<f64> {
        self.read_attribute(&self.mbean, counter, Some(window_path)).await
    }
}

pub mod actors;
pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod publisher;
pub mod registry;
pub mod service;
pub mod storage;
pub mod upstream;
pub mod util;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use error::{RelayError, RelayResult, ValidationError};

/// Maximum number of samples carried in a published envelope
pub const SAMPLE_CAP: usize = 10;

const MAX_APPLICATION_ID_LEN: usize = 253;

static APPLICATION_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.:-]+$").expect("valid application id pattern"));

static METRIC_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_:][a-zA-Z0-9_:]*$").expect("valid metric name pattern"));

/// Identifier of a monitored application, as carried by the backend's
/// `application_id` label.
///
/// Only `[A-Za-z0-9_.:-]` is accepted, which keeps the value safe to embed
/// in a selector without escaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApplicationId(String);

impl ApplicationId {
    /// Parse and allow-list an application id. Surrounding whitespace is ignored.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            return Err(ValidationError::BlankApplicationId);
        }
        if raw.len() > MAX_APPLICATION_ID_LEN || !APPLICATION_ID_PATTERN.is_match(raw) {
            return Err(ValidationError::IllegalApplicationId(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ApplicationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ApplicationId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ApplicationId> for String {
    fn from(value: ApplicationId) -> Self {
        value.0
    }
}

/// Name of a time series metric (Prometheus metric grammar)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MetricName(String);

impl MetricName {
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            return Err(ValidationError::BlankMetricName);
        }
        if !METRIC_NAME_PATTERN.is_match(raw) {
            return Err(ValidationError::IllegalMetricName(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MetricName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MetricName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<MetricName> for String {
    fn from(value: MetricName) -> Self {
        value.0
    }
}

/// Timestamp of a sample exactly as the backend reported it
///
/// Prometheus-style backends send epoch seconds as a JSON number, some proxies
/// send them as strings. The upstream representation is kept so the
/// republished envelope does not change precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleTimestamp {
    Number(serde_json::Number),
    Text(String),
}

impl SampleTimestamp {
    /// Seconds since the epoch, if the timestamp is numeric or a numeric string
    pub fn as_secs_f64(&self) -> Option<f64> {
        match self {
            SampleTimestamp::Number(n) => n.as_f64(),
            SampleTimestamp::Text(s) => s.parse().ok(),
        }
    }
}

impl From<i64> for SampleTimestamp {
    fn from(value: i64) -> Self {
        SampleTimestamp::Number(value.into())
    }
}

/// One row of an instant-query result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Label set of the series, including `__name__` when present
    #[serde(rename = "metric")]
    pub labels: BTreeMap<String, String>,
    pub timestamp: SampleTimestamp,
    pub value: String,
}

impl Sample {
    pub fn metric_name(&self) -> Option<&str> {
        self.labels.get("__name__").map(String::as_str)
    }
}

/// Capped view over the samples of one collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    #[serde(rename = "metrics")]
    pub samples: Vec<Sample>,
    pub total_count: usize,
    pub returned_count: usize,
}

impl MetricsSummary {
    /// Keep the first `cap` samples in upstream order, remembering the true total
    pub fn capped(mut samples: Vec<Sample>, cap: usize) -> Self {
        let total_count = samples.len();
        samples.truncate(cap);
        Self {
            returned_count: samples.len(),
            samples,
            total_count,
        }
    }
}

/// Per-application result published to the message buses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishEnvelope {
    pub application_id: ApplicationId,

    /// When the metrics were collected
    pub timestamp: DateTime<Utc>,

    #[serde(rename = "metrics")]
    pub summary: MetricsSummary,
}

impl PublishEnvelope {
    pub fn new(application_id: ApplicationId, summary: MetricsSummary) -> Self {
        Self {
            application_id,
            timestamp: Utc::now(),
            summary,
        }
    }
}

//! HTTP client for the time-series backend

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, info, instrument, trace};
use url::Url;

use crate::config::UpstreamConfig;
use crate::{ApplicationId, MetricName};

use super::query::QueryBuilder;

/// Decoded JSON body as returned by the backend. An empty body decodes to `Null`.
pub type RawResponse = serde_json::Value;

/// Failure talking to the backend
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid upstream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Read-only queries against the backend
///
/// Every call is a single attempt; there is no retry at this layer.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// All series whose `application_id` label equals `app`
    async fn fetch_all(&self, app: &ApplicationId) -> Result<RawResponse, UpstreamError>;

    /// Series of `app` whose metric name is one of `names`
    ///
    /// An empty `names` slice produces a selector that matches nothing; callers guard.
    async fn fetch_named(
        &self,
        app: &ApplicationId,
        names: &[MetricName],
    ) -> Result<RawResponse, UpstreamError>;

    /// Every known value of the `application_id` label
    async fn fetch_label_values(&self) -> Result<RawResponse, UpstreamError>;
}

/// [`UpstreamClient`] backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    /// HTTP client (reused across requests)
    client: reqwest::Client,

    base_url: String,
}

impl HttpUpstream {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        // reject unusable base URLs up front instead of on the first sweep
        Url::parse(&config.base_url)?;

        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, url: Url) -> Result<RawResponse, UpstreamError> {
        trace!("GET {url}");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| UpstreamError::Transport {
                url: url.to_string(),
                source,
            })?;

        if body.trim().is_empty() {
            debug!("{url}: empty body");
            return Ok(RawResponse::Null);
        }

        serde_json::from_str(&body).map_err(|source| UpstreamError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstream {
    #[instrument(skip(self), fields(app = %app))]
    async fn fetch_all(&self, app: &ApplicationId) -> Result<RawResponse, UpstreamError> {
        info!("fetching all metrics for application");
        let selector = QueryBuilder::application_selector(app);
        self.get(QueryBuilder::instant_query_url(&self.base_url, &selector)?)
            .await
    }

    #[instrument(skip(self, names), fields(app = %app, count = names.len()))]
    async fn fetch_named(
        &self,
        app: &ApplicationId,
        names: &[MetricName],
    ) -> Result<RawResponse, UpstreamError> {
        debug!("fetching specific metrics {names:?}");
        let selector = QueryBuilder::named_selector(app, names);
        self.get(QueryBuilder::instant_query_url(&self.base_url, &selector)?)
            .await
    }

    #[instrument(skip(self))]
    async fn fetch_label_values(&self) -> Result<RawResponse, UpstreamError> {
        self.get(QueryBuilder::label_values_url(&self.base_url)?)
            .await
    }
}

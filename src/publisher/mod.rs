//! Fan-out publishing of per-application envelopes
//!
//! ```text
//!                       ┌──────────────▶ queue bus  (metrics-topic)
//! PublishEnvelope ──serialize once──┤
//!                       └──────────────▶ topic bus  (metrics.exchange, key metrics.<app>)
//! ```
//!
//! A serialization failure aborts both deliveries. Once serialized, both
//! buses are attempted independently and the outcome of each is reported.

pub mod channel;
pub mod kafka;
pub mod rabbit;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::{PublisherConfig, QueueTransport, TopicTransport};
use crate::{ApplicationId, PublishEnvelope};

pub use channel::ChannelBus;
pub use kafka::KafkaRestBus;
pub use rabbit::RabbitHttpBus;

/// Routing key used on the topic-style destination
pub fn routing_key(app: &ApplicationId) -> String {
    format!("metrics.{app}")
}

/// A serialized envelope ready for delivery
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub application_id: ApplicationId,
    pub routing_key: String,
    /// JSON text of the envelope
    pub payload: Arc<str>,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to serialize envelope: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid broker URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{destination}: request failed: {source}")]
    Transport {
        destination: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{destination}: broker answered with HTTP {status}: {body}")]
    Rejected {
        destination: String,
        status: StatusCode,
        body: String,
    },

    #[error("{destination}: {reason}")]
    Refused { destination: String, reason: String },

    #[error("publish failed for {}", format_failures(.failures))]
    Partial { failures: Vec<(String, String)> },
}

fn format_failures(failures: &[(String, String)]) -> String {
    failures
        .iter()
        .map(|(destination, reason)| format!("{destination} ({reason})"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `base_url` with `segments` appended, each percent-encoded as a single path segment
fn endpoint_url(base_url: &str, segments: &[&str]) -> Result<Url, PublishError> {
    let mut url = Url::parse(base_url)?;
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// One message-bus destination
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Destination label for logs and reports
    fn name(&self) -> &str;

    /// Single delivery attempt, no retry
    async fn publish(&self, message: &OutboundMessage) -> Result<(), PublishError>;
}

/// Outcome of one destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub destination: String,
    pub error: Option<String>,
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-destination outcome of a fan-out publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub deliveries: Vec<Delivery>,
}

impl PublishReport {
    pub fn all_delivered(&self) -> bool {
        self.deliveries.iter().all(Delivery::is_delivered)
    }

    /// `Err(Partial)` naming every failed destination
    pub fn into_result(self) -> Result<(), PublishError> {
        let failures: Vec<(String, String)> = self
            .deliveries
            .into_iter()
            .filter_map(|d| d.error.map(|e| (d.destination, e)))
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(PublishError::Partial { failures })
        }
    }
}

impl fmt::Display for PublishReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let delivered = self.deliveries.iter().filter(|d| d.is_delivered()).count();
        write!(f, "{delivered}/{} destinations", self.deliveries.len())
    }
}

/// Publishes every envelope to a queue-style and a topic-style bus
#[derive(Clone)]
pub struct FanoutPublisher {
    queue: Arc<dyn MessageBus>,
    topic: Arc<dyn MessageBus>,
}

impl std::fmt::Debug for FanoutPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutPublisher")
            .field("queue", &self.queue.name())
            .field("topic", &self.topic.name())
            .finish()
    }
}

impl FanoutPublisher {
    pub fn new(queue: Arc<dyn MessageBus>, topic: Arc<dyn MessageBus>) -> Self {
        Self { queue, topic }
    }

    /// Build both buses from configuration, sharing one HTTP client
    pub fn from_config(config: &PublisherConfig) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        let queue: Arc<dyn MessageBus> = match &config.queue {
            QueueTransport::Channel { name } => Arc::new(ChannelBus::new(name.clone(), 64)),
            QueueTransport::KafkaRest { url, topic } => {
                Arc::new(KafkaRestBus::new(client.clone(), url, topic.clone())?)
            }
        };

        let topic: Arc<dyn MessageBus> = match &config.topic {
            TopicTransport::Channel { name } => Arc::new(ChannelBus::new(name.clone(), 64)),
            TopicTransport::RabbitHttp {
                url,
                vhost,
                exchange,
                username,
                password,
            } => Arc::new(RabbitHttpBus::new(
                client,
                url,
                vhost,
                exchange.clone(),
                username.clone(),
                password.clone(),
            )?),
        };

        Ok(Self::new(queue, topic))
    }

    pub fn destinations(&self) -> [&str; 2] {
        [self.queue.name(), self.topic.name()]
    }

    /// Serialize `envelope` and attempt both destinations
    ///
    /// Only a serialization failure is returned as `Err`; delivery failures
    /// are carried in the report.
    #[instrument(skip_all, fields(app = %envelope.application_id))]
    pub async fn publish(&self, envelope: &PublishEnvelope) -> Result<PublishReport, PublishError> {
        let payload = serde_json::to_string(envelope)?;

        let message = OutboundMessage {
            application_id: envelope.application_id.clone(),
            routing_key: routing_key(&envelope.application_id),
            payload: payload.into(),
        };

        let (queue, topic) = tokio::join!(self.queue.publish(&message), self.topic.publish(&message));

        let deliveries = [(&self.queue, queue), (&self.topic, topic)]
            .into_iter()
            .map(|(bus, result)| {
                let error = match result {
                    Ok(()) => {
                        debug!(destination = bus.name(), "delivered");
                        None
                    }
                    Err(e) => {
                        warn!(destination = bus.name(), "delivery failed: {e}");
                        Some(e.to_string())
                    }
                };
                Delivery {
                    destination: bus.name().to_string(),
                    error,
                }
            })
            .collect();

        Ok(PublishReport { deliveries })
    }
}

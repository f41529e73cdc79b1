//! Queue-style destination over a Kafka REST proxy (v2, JSON embedded format)

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{instrument, trace};
use url::Url;

use super::{MessageBus, OutboundMessage, PublishError, endpoint_url};

const KAFKA_JSON_V2: &str = "application/vnd.kafka.json.v2+json";

#[derive(Debug, Deserialize)]
struct ProduceResponse {
    #[serde(default)]
    offsets: Vec<RecordOffset>,
}

#[derive(Debug, Deserialize)]
struct RecordOffset {
    #[serde(default)]
    error: Option<String>,
}

pub struct KafkaRestBus {
    client: Client,
    endpoint: Url,
    topic: String,
}

impl KafkaRestBus {
    /// `POST {base_url}/topics/{topic}`, with the topic encoded as one path segment
    pub fn new(
        client: Client,
        base_url: impl AsRef<str>,
        topic: impl Into<String>,
    ) -> Result<Self, PublishError> {
        let topic = topic.into();
        let endpoint = endpoint_url(base_url.as_ref(), &["topics", &topic])?;
        Ok(Self {
            client,
            endpoint,
            topic,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}

#[async_trait]
impl MessageBus for KafkaRestBus {
    fn name(&self) -> &str {
        &self.topic
    }

    #[instrument(skip_all, fields(destination = %self.topic, app = %message.application_id))]
    async fn publish(&self, message: &OutboundMessage) -> Result<(), PublishError> {
        // embed the envelope as JSON; fall back to a plain string value
        let value: Value = serde_json::from_str(&message.payload)
            .unwrap_or_else(|_| Value::String(message.payload.to_string()));

        let body = json!({
            "records": [{ "key": message.application_id.as_str(), "value": value }]
        });

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, KAFKA_JSON_V2)
            .body(body.to_string())
            .send()
            .await
            .map_err(|source| PublishError::Transport {
                destination: self.topic.clone(),
                source,
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(PublishError::Rejected {
                destination: self.topic.clone(),
                status,
                body: text,
            });
        }

        if let Ok(produced) = serde_json::from_str::<ProduceResponse>(&text) {
            if let Some(reason) = produced.offsets.into_iter().find_map(|o| o.error) {
                return Err(PublishError::Refused {
                    destination: self.topic.clone(),
                    reason,
                });
            }
        }

        trace!("record accepted by REST proxy");
        Ok(())
    }
}

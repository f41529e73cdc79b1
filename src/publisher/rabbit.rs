//! Topic-style destination over the RabbitMQ management HTTP API
//!
//! `POST {url}/api/exchanges/{vhost}/{exchange}/publish` with basic auth. The
//! broker answers `{"routed": bool}`; an unrouted message is delivered from
//! our side but logged, since nothing was bound to the routing key.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{instrument, trace, warn};
use url::Url;

use super::{MessageBus, OutboundMessage, PublishError, endpoint_url};

#[derive(Debug, Deserialize)]
struct PublishResponse {
    routed: bool,
}

pub struct RabbitHttpBus {
    client: Client,
    endpoint: Url,
    exchange: String,
    username: String,
    password: String,
}

impl RabbitHttpBus {
    pub fn new(
        client: Client,
        base_url: impl AsRef<str>,
        vhost: impl AsRef<str>,
        exchange: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, PublishError> {
        let exchange = exchange.into();
        let endpoint = endpoint_url(
            base_url.as_ref(),
            &["api", "exchanges", vhost.as_ref(), &exchange, "publish"],
        )?;
        Ok(Self {
            client,
            endpoint,
            exchange,
            username: username.into(),
            password: password.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}

#[async_trait]
impl MessageBus for RabbitHttpBus {
    fn name(&self) -> &str {
        &self.exchange
    }

    #[instrument(skip_all, fields(destination = %self.exchange, routing_key = %message.routing_key))]
    async fn publish(&self, message: &OutboundMessage) -> Result<(), PublishError> {
        let body = json!({
            "properties": { "content_type": "application/json" },
            "routing_key": message.routing_key,
            "payload": &*message.payload,
            "payload_encoding": "string",
        });

        let response = self
            .client
            .post(self.endpoint.clone())
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|source| PublishError::Transport {
                destination: self.exchange.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PublishError::Rejected {
                destination: self.exchange.clone(),
                status,
                body: text,
            });
        }

        match response.json::<PublishResponse>().await {
            Ok(PublishResponse { routed: false }) => {
                warn!("message was not routed to any queue");
            }
            Ok(_) => trace!("message routed"),
            Err(e) => trace!("unreadable publish response: {e}"),
        }
        Ok(())
    }
}

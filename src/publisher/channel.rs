//! In-process bus over a tokio broadcast channel

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::trace;

use super::{MessageBus, OutboundMessage, PublishError};

pub struct ChannelBus {
    name: String,
    sender: broadcast::Sender<OutboundMessage>,
}

impl ChannelBus {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            name: name.into(),
            sender,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutboundMessage> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl MessageBus for ChannelBus {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, message: &OutboundMessage) -> Result<(), PublishError> {
        // no subscribers is fine, the message is simply dropped
        match self.sender.send(message.clone()) {
            Ok(receivers) => trace!(bus = %self.name, "published to {receivers} receivers"),
            Err(_) => trace!(bus = %self.name, "no receivers for message"),
        }
        Ok(())
    }
}

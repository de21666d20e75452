use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};

use crate::dispatcher::CommandPublisher;
use crate::error::DispatchError;

/// A message as carried on a channel: partition key plus encoded envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub key: String,
    pub body: String,
}

/// In-process message substrate backed by bounded tokio channels.
///
/// Each channel has a single consumer side, obtained from [`InMemoryBroker::bind`].
/// Publishing to a channel that is unbound, or whose receiver was dropped,
/// fails with [`DispatchError::ChannelUnavailable`].
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    channels: Arc<RwLock<HashMap<String, Sender<Message>>>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates (or replaces) a channel and returns its consumer side.
    pub async fn bind(&self, channel: &str, capacity: usize) -> Receiver<Message> {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        self.channels
            .write()
            .await
            .insert(channel.to_string(), sender);
        receiver
    }

    /// Removes a channel; later publishes to it fail.
    pub async fn unbind(&self, channel: &str) {
        self.channels.write().await.remove(channel);
    }
}

#[async_trait]
impl CommandPublisher for InMemoryBroker {
    async fn publish(&self, channel: &str, key: &str, body: String) -> Result<(), DispatchError> {
        let channels = self.channels.read().await;
        let sender = channels
            .get(channel)
            .ok_or_else(|| DispatchError::ChannelUnavailable {
                channel: channel.to_string(),
            })?;

        let message = Message {
            key: key.to_string(),
            body,
        };
        sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => DispatchError::ChannelFull {
                channel: channel.to_string(),
            },
            TrySendError::Closed(_) => DispatchError::ChannelUnavailable {
                channel: channel.to_string(),
            },
        })
    }
}

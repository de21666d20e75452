use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::envelope::{CommandEnvelope, EntityKind};
use crate::error::DispatchError;

/// The message-delivery substrate. Implementations must provide at-least-once
/// delivery; returning `Ok` means the message was accepted locally.
#[async_trait]
pub trait CommandPublisher: Send + Sync {
    async fn publish(&self, channel: &str, key: &str, body: String) -> Result<(), DispatchError>;
}

/// Publishes command envelopes onto the channel of their entity kind.
#[derive(Clone)]
pub struct CommandDispatcher {
    publisher: Arc<dyn CommandPublisher>,
}

impl CommandDispatcher {
    pub fn new(publisher: Arc<dyn CommandPublisher>) -> Self {
        Self { publisher }
    }

    /// Encodes and publishes one envelope. Returns once the substrate has
    /// accepted it; nothing is learned about remote processing.
    pub async fn dispatch<K, T>(
        &self,
        entity: EntityKind,
        envelope: &CommandEnvelope<K, T>,
    ) -> Result<(), DispatchError>
    where
        K: Serialize + std::fmt::Display + Sync,
        T: Serialize + Sync,
    {
        let body = serde_json::to_string(envelope)?;
        let channel = entity.channel();

        self.publisher
            .publish(channel, &envelope.key.to_string(), body)
            .await
            .inspect_err(|e| {
                tracing::error!(channel, key = %envelope.key, error = %e, "command dispatch failed");
            })?;

        metrics::counter!(
            "commands_dispatched_total",
            "entity" => entity.as_str(),
            "kind" => envelope.kind.as_str()
        )
        .increment(1);
        tracing::debug!(channel, key = %envelope.key, kind = %envelope.kind, "command dispatched");

        Ok(())
    }
}

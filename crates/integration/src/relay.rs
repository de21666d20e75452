use std::time::Duration;

use async_trait::async_trait;
use common::ProductId;
use messaging::{
    CommandEnvelope, CommandKind, CommandProcessor, EntityKind, Message, ProcessingError, decode,
};
use resilience::{PolicyError, RetryConfig, retry_on_transient};

use crate::error::ServiceError;
use crate::transport::HttpTransport;

/// Applies commands from one channel to the owning service over HTTP.
///
/// Each attempt is bounded by `timeout`; expiry counts as a transient
/// failure. Transient failures are retried under the relay's own policy, so a
/// command may reach the owner more than once. Duplicate rejections are
/// logged and dropped.
pub struct HttpCommandRelay {
    entity: EntityKind,
    base_url: String,
    transport: HttpTransport,
    retry: RetryConfig,
    timeout: Duration,
}

impl HttpCommandRelay {
    pub fn new(
        entity: EntityKind,
        base_url: impl Into<String>,
        transport: HttpTransport,
        retry: RetryConfig,
        timeout: Duration,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            entity,
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            retry,
            timeout,
        }
    }

    async fn apply(
        &self,
        envelope: &CommandEnvelope<ProductId, serde_json::Value>,
    ) -> Result<(), ServiceError> {
        let resource = format!("{}/{}", self.base_url, self.entity.as_str());

        match (envelope.kind, &envelope.payload) {
            (CommandKind::Create, Some(payload)) => {
                self.transport.post_json(&resource, payload).await
            }
            (CommandKind::Create, None) => Err(ServiceError::InvalidInput(format!(
                "CREATE command for key {} has no payload",
                envelope.key
            ))),
            (CommandKind::Delete, _) => {
                let deleted = match self.entity {
                    EntityKind::Product => {
                        let url = format!("{resource}/{}", envelope.key);
                        self.transport.delete(&url, &[]).await
                    }
                    EntityKind::Recommendation | EntityKind::Review => {
                        self.transport
                            .delete(&resource, &[("productId", envelope.key.to_string())])
                            .await
                    }
                };
                match deleted {
                    Err(ServiceError::NotFound(_)) => Ok(()),
                    other => other,
                }
            }
        }
    }
}

#[async_trait]
impl CommandProcessor for HttpCommandRelay {
    async fn process(&self, message: &Message) -> Result<(), ProcessingError> {
        let envelope: CommandEnvelope<ProductId, serde_json::Value> = decode(&message.body)?;
        tracing::info!(
            entity = self.entity.as_str(),
            key = %envelope.key,
            kind = %envelope.kind,
            created_at = %envelope.created_at,
            "relaying command"
        );

        retry_on_transient(&self.retry, |_attempt| async {
            tokio::time::timeout(self.timeout, self.apply(&envelope))
                .await
                .unwrap_or_else(|_| Err(ServiceError::timed_out(self.timeout)))
        })
        .await
        .into_result()
        .map_err(|e| match e {
            ServiceError::InvalidInput(msg) => ProcessingError::Rejected(msg),
            other => ProcessingError::Failed(other.to_string()),
        })
    }
}

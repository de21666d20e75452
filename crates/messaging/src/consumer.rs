use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc::Receiver;

use crate::broker::Message;
use crate::envelope::{CommandEnvelope, CommandKind};
use crate::error::ProcessingError;

/// The downstream side of a command channel.
///
/// On CREATE an implementation stores the payload or rejects it as a
/// duplicate; on DELETE it removes every record matching the key and
/// succeeds when none match.
#[async_trait]
pub trait CommandProcessor: Send + Sync {
    async fn process(&self, message: &Message) -> Result<(), ProcessingError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnvelope<K> {
    kind: String,
    key: K,
    payload: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

/// Decodes a channel message into a typed envelope.
///
/// Unknown kinds surface as [`ProcessingError::UnsupportedKind`] rather than a
/// generic decode failure.
pub fn decode<K, T>(body: &str) -> Result<CommandEnvelope<K, T>, ProcessingError>
where
    K: DeserializeOwned + std::fmt::Display,
    T: DeserializeOwned,
{
    let raw: RawEnvelope<K> =
        serde_json::from_str(body).map_err(|e| ProcessingError::Malformed(e.to_string()))?;

    let kind = match raw.kind.as_str() {
        "CREATE" => CommandKind::Create,
        "DELETE" => CommandKind::Delete,
        other => return Err(ProcessingError::UnsupportedKind(other.to_string())),
    };

    let payload = match (kind, raw.payload) {
        (CommandKind::Create, None) => {
            return Err(ProcessingError::MissingPayload(raw.key.to_string()));
        }
        (CommandKind::Create, Some(value)) => Some(
            serde_json::from_value(value).map_err(|e| ProcessingError::Malformed(e.to_string()))?,
        ),
        (CommandKind::Delete, _) => None,
    };

    Ok(CommandEnvelope {
        kind,
        key: raw.key,
        payload,
        created_at: raw.created_at,
    })
}

/// Drains a channel into a processor until every sender is gone.
///
/// Processing errors are logged and the message is dropped.
pub async fn run_consumer<P>(channel: &str, mut receiver: Receiver<Message>, processor: Arc<P>)
where
    P: CommandProcessor + ?Sized,
{
    tracing::info!(channel, "command consumer started");

    while let Some(message) = receiver.recv().await {
        match processor.process(&message).await {
            Ok(()) => {
                tracing::debug!(channel, key = %message.key, "command processed");
            }
            Err(e) => {
                metrics::counter!("commands_rejected_total", "channel" => channel.to_string())
                    .increment(1);
                tracing::warn!(channel, key = %message.key, error = %e, "command processing failed");
            }
        }
    }

    tracing::info!(channel, "command consumer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use tokio::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        name: String,
    }

    #[test]
    fn decode_round_trips_a_create() {
        let envelope = CommandEnvelope::create(3, Item { name: "n".into() });
        let body = serde_json::to_string(&envelope).unwrap();

        let decoded: CommandEnvelope<i32, Item> = decode(&body).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn decode_rejects_unknown_kind() {
        let body = r#"{"kind":"UPDATE","key":1,"createdAt":"2024-01-01T00:00:00Z"}"#;
        let result = decode::<i32, Item>(body);
        assert!(matches!(result, Err(ProcessingError::UnsupportedKind(k)) if k == "UPDATE"));
    }

    #[test]
    fn decode_rejects_create_without_payload() {
        let body = r#"{"kind":"CREATE","key":1,"createdAt":"2024-01-01T00:00:00Z"}"#;
        let result = decode::<i32, Item>(body);
        assert!(matches!(result, Err(ProcessingError::MissingPayload(_))));
    }

    #[test]
    fn decode_ignores_payload_on_delete() {
        let body = r#"{"kind":"DELETE","key":1,"payload":{"name":"x"},"createdAt":"2024-01-01T00:00:00Z"}"#;
        let decoded = decode::<i32, Item>(body).unwrap();
        assert_eq!(decoded.kind, CommandKind::Delete);
        assert!(decoded.payload.is_none());
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CommandProcessor for Recorder {
        async fn process(&self, message: &Message) -> Result<(), ProcessingError> {
            self.seen.lock().await.push(message.key.clone());
            if message.key == "bad" {
                return Err(ProcessingError::Rejected("bad".into()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn run_consumer_continues_past_failures() {
        let (tx, rx) = tokio::sync::mpsc::channel(8);
        let recorder = Arc::new(Recorder::default());

        for key in ["1", "bad", "2"] {
            tx.send(Message {
                key: key.to_string(),
                body: String::new(),
            })
            .await
            .unwrap();
        }
        drop(tx);

        run_consumer("test", rx, recorder.clone()).await;
        assert_eq!(*recorder.seen.lock().await, vec!["1", "bad", "2"]);
    }
}

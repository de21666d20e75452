use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommandKind {
    Create,
    Delete,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Create => "CREATE",
            CommandKind::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The owner a command is addressed to. Each owner has its own channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Product,
    Recommendation,
    Review,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [
        EntityKind::Product,
        EntityKind::Recommendation,
        EntityKind::Review,
    ];

    /// Name of the channel carrying commands for this entity kind.
    pub fn channel(&self) -> &'static str {
        match self {
            EntityKind::Product => "products",
            EntityKind::Recommendation => "recommendations",
            EntityKind::Review => "reviews",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Product => "product",
            EntityKind::Recommendation => "recommendation",
            EntityKind::Review => "review",
        }
    }
}

/// A single asynchronous write addressed to one owning service.
///
/// `payload` is present on CREATE and absent on DELETE. The envelope is not
/// retained after dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandEnvelope<K, T> {
    pub kind: CommandKind,
    pub key: K,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<T>,
    pub created_at: DateTime<Utc>,
}

impl<K, T> CommandEnvelope<K, T> {
    pub fn create(key: K, payload: T) -> Self {
        Self {
            kind: CommandKind::Create,
            key,
            payload: Some(payload),
            created_at: Utc::now(),
        }
    }

    pub fn delete(key: K) -> Self {
        Self {
            kind: CommandKind::Delete,
            key,
            payload: None,
            created_at: Utc::now(),
        }
    }
}

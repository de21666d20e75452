use thiserror::Error;

/// Errors surfaced synchronously when publishing a command.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No live consumer side is bound to the channel.
    #[error("Channel unavailable: {channel}")]
    ChannelUnavailable { channel: String },

    /// The channel did not accept the message because it is at capacity.
    #[error("Channel full: {channel}")]
    ChannelFull { channel: String },

    /// The envelope could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by a consumer while applying a command. Never retried by
/// the dispatcher, and never visible to the caller that issued the command.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The message is not a well-formed envelope.
    #[error("Malformed command: {0}")]
    Malformed(String),

    /// The envelope kind is neither CREATE nor DELETE.
    #[error("Incorrect command kind: {0}, expected a CREATE or DELETE command")]
    UnsupportedKind(String),

    /// A CREATE envelope arrived without a payload.
    #[error("CREATE command for key {0} has no payload")]
    MissingPayload(String),

    /// The owning service refused the command (for example a duplicate key).
    #[error("Command rejected: {0}")]
    Rejected(String),

    /// The owning service could not be reached or failed unexpectedly.
    #[error("Command failed: {0}")]
    Failed(String),
}

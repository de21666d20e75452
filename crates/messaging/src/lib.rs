//! Asynchronous write path of the composite service.
//!
//! Writes are decomposed into [`CommandEnvelope`]s and published onto one
//! channel per entity kind. Publishing is fire-and-forget: a dispatch returns
//! once the channel has accepted the message, never after the owning service
//! has applied it. Delivery is at-least-once, so consumers must be idempotent.

pub mod broker;
pub mod consumer;
pub mod dispatcher;
pub mod envelope;
pub mod error;

pub use broker::{InMemoryBroker, Message};
pub use consumer::{CommandProcessor, decode, run_consumer};
pub use dispatcher::{CommandDispatcher, CommandPublisher};
pub use envelope::{CommandEnvelope, CommandKind, EntityKind};
pub use error::{DispatchError, ProcessingError};

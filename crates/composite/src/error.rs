//! Orchestrator error types.

use common::InvalidProductId;
use integration::ServiceError;
use messaging::DispatchError;
use thiserror::Error;

/// Errors returned by aggregate operations.
///
/// Downstream messages are carried through unchanged so callers see the
/// owning service's wording.
#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidInput(String),

    /// The product service could not be reached, timed out, or its breaker is open.
    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Unexpected(String),

    /// A command was not accepted by its channel.
    #[error("Command dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),
}

impl From<ServiceError> for CompositeError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(msg) => Self::NotFound(msg),
            ServiceError::InvalidInput(msg) => Self::InvalidInput(msg),
            ServiceError::Transient(msg) => Self::Unavailable(msg),
            ServiceError::Unexpected(msg) => Self::Unexpected(msg),
        }
    }
}

impl From<InvalidProductId> for CompositeError {
    fn from(err: InvalidProductId) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

//! Translation of downstream transport failures into service error kinds.

use std::time::Duration;

use reqwest::StatusCode;
use resilience::{IsTransient, PolicyError};
use serde::Deserialize;
use thiserror::Error;

/// Outcome kinds of a failed downstream call.
///
/// `NotFound` and `InvalidInput` carry the downstream message verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The requested entity does not exist. Never retried.
    #[error("{0}")]
    NotFound(String),

    /// The request was malformed, out of range or a duplicate. Never retried.
    #[error("{0}")]
    InvalidInput(String),

    /// Timeout, connection failure, 5xx-class status or open circuit.
    /// Retried within the caller's policy.
    #[error("{0}")]
    Transient(String),

    /// Any other downstream response. Never retried.
    #[error("{0}")]
    Unexpected(String),
}

impl ServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "not_found",
            ServiceError::InvalidInput(_) => "invalid_input",
            ServiceError::Transient(_) => "transient",
            ServiceError::Unexpected(_) => "unexpected",
        }
    }
}

impl IsTransient for ServiceError {
    fn is_transient(&self) -> bool {
        matches!(self, ServiceError::Transient(_))
    }

    fn is_breaker_failure(&self) -> bool {
        matches!(self, ServiceError::Transient(_) | ServiceError::Unexpected(_))
    }
}

impl PolicyError for ServiceError {
    fn timed_out(after: Duration) -> Self {
        ServiceError::Transient(format!("Timed out after {}ms", after.as_millis()))
    }

    fn circuit_open(breaker: &str) -> Self {
        ServiceError::Transient(format!("Circuit breaker '{breaker}' is open"))
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            tracing::warn!(error = %err, "could not decode downstream response");
            return ServiceError::Unexpected(err.to_string());
        }
        if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
            return ServiceError::Transient(err.to_string());
        }
        tracing::warn!(error = %err, "unexpected transport error");
        ServiceError::Unexpected(err.to_string())
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Maps a non-success status and its body to an error kind.
pub fn translate_status(status: StatusCode, body: &str) -> ServiceError {
    match status {
        StatusCode::NOT_FOUND => ServiceError::NotFound(error_message(body)),
        StatusCode::UNPROCESSABLE_ENTITY => ServiceError::InvalidInput(error_message(body)),
        s if s.is_server_error()
            || s == StatusCode::REQUEST_TIMEOUT
            || s == StatusCode::TOO_MANY_REQUESTS =>
        {
            ServiceError::Transient(format!("{s}: {}", error_message(body)))
        }
        s => {
            tracing::warn!(status = %s, body, "unexpected HTTP status from downstream");
            ServiceError::Unexpected(format!("{s}: {}", error_message(body)))
        }
    }
}

/// The `message` of an error body, or the raw body when it is not one.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_keeps_downstream_message() {
        let body = r#"{"timestamp":"2024-01-01T00:00:00Z","path":"/product/13","httpStatus":404,"message":"No product found for productId: 13"}"#;
        assert_eq!(
            translate_status(StatusCode::NOT_FOUND, body),
            ServiceError::NotFound("No product found for productId: 13".to_string())
        );
    }

    #[test]
    fn unprocessable_is_invalid_input() {
        let body = r#"{"httpStatus":"UNPROCESSABLE_ENTITY","message":"Invalid productId: -1"}"#;
        assert_eq!(
            translate_status(StatusCode::UNPROCESSABLE_ENTITY, body),
            ServiceError::InvalidInput("Invalid productId: -1".to_string())
        );
    }

    #[test]
    fn non_json_body_is_used_verbatim() {
        assert_eq!(
            translate_status(StatusCode::NOT_FOUND, "gone"),
            ServiceError::NotFound("gone".to_string())
        );
    }

    #[test]
    fn server_errors_are_transient_and_others_unexpected() {
        assert!(translate_status(StatusCode::INTERNAL_SERVER_ERROR, "").is_transient());
        assert!(translate_status(StatusCode::SERVICE_UNAVAILABLE, "").is_transient());
        assert!(translate_status(StatusCode::TOO_MANY_REQUESTS, "").is_transient());

        let err = translate_status(StatusCode::FORBIDDEN, "nope");
        assert!(matches!(err, ServiceError::Unexpected(_)));
        assert!(!err.is_transient());
        assert!(err.is_breaker_failure());
    }

    #[test]
    fn terminal_kinds_are_not_breaker_failures() {
        assert!(!ServiceError::NotFound(String::new()).is_breaker_failure());
        assert!(!ServiceError::InvalidInput(String::new()).is_breaker_failure());
    }

    #[test]
    fn pipeline_failures_are_transient() {
        assert!(ServiceError::timed_out(Duration::from_secs(2)).is_transient());
        let open = ServiceError::circuit_open("product");
        assert_eq!(open, ServiceError::Transient("Circuit breaker 'product' is open".into()));
    }
}

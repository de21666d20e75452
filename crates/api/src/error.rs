//! API error type with HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::HttpErrorInfo;
use composite::CompositeError;

const UNAVAILABLE: &str = "Product service unavailable";
const DISPATCH_UNAVAILABLE: &str = "Command channel unavailable";
const INTERNAL: &str = "Internal error";

/// An error response: always rendered as an [`HttpErrorInfo`] body.
///
/// `detail` is logged but never sent to the caller.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    path: String,
    message: String,
    detail: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            path: path.into(),
            message: message.into(),
            detail: None,
        }
    }

    /// Maps an orchestrator error raised while serving `path`.
    ///
    /// NotFound and InvalidInput keep the downstream message; every other
    /// error answers with a fixed message and keeps the cause as `detail`.
    pub fn from_composite(err: CompositeError, path: impl Into<String>) -> Self {
        let (status, generic) = match &err {
            CompositeError::NotFound(msg) => {
                return Self::new(StatusCode::NOT_FOUND, path, msg.clone());
            }
            CompositeError::InvalidInput(msg) => {
                return Self::new(StatusCode::UNPROCESSABLE_ENTITY, path, msg.clone());
            }
            CompositeError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, UNAVAILABLE),
            CompositeError::Dispatch(_) => (StatusCode::SERVICE_UNAVAILABLE, DISPATCH_UNAVAILABLE),
            CompositeError::Unexpected(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL),
        };

        Self {
            detail: Some(err.to_string()),
            ..Self::new(status, path, generic)
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            let cause = self.detail.as_deref().unwrap_or(&self.message);
            tracing::error!(status = %self.status, path = %self.path, error = %cause, "request failed");
        } else {
            tracing::debug!(status = %self.status, path = %self.path, error = %self.message, "request rejected");
        }

        let body = HttpErrorInfo::new(self.status.as_u16(), self.path, self.message);
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use messaging::DispatchError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CompositeError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                CompositeError::InvalidInput("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                CompositeError::Unavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                CompositeError::Unexpected("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CompositeError::Dispatch(DispatchError::ChannelUnavailable {
                    channel: "products".into(),
                }),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from_composite(err, "/aggregate/1").status(), expected);
        }
    }

    #[test]
    fn test_server_errors_hide_downstream_detail() {
        let err = ApiError::from_composite(
            CompositeError::Unavailable(
                "error sending request for url (http://product:8080/product/1)".into(),
            ),
            "/aggregate/1",
        );
        assert_eq!(err.message, "Product service unavailable");
        assert!(err.detail.unwrap().contains("http://product:8080"));

        let err = ApiError::from_composite(
            CompositeError::Unexpected("403 Forbidden: secret".into()),
            "/aggregate/1",
        );
        assert_eq!(err.message, "Internal error");

        let err = ApiError::from_composite(
            CompositeError::Dispatch(DispatchError::ChannelFull {
                channel: "products".into(),
            }),
            "/aggregate",
        );
        assert_eq!(err.message, "Command channel unavailable");
    }

    #[test]
    fn test_message_is_carried_verbatim() {
        let err = ApiError::from_composite(
            CompositeError::NotFound("No product found for productId: 13".into()),
            "/aggregate/13",
        );
        assert_eq!(err.message, "No product found for productId: 13");
        assert_eq!(err.path, "/aggregate/13");
    }
}

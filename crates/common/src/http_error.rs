use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error body returned by the composite service and by the downstream services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpErrorInfo {
    pub timestamp: DateTime<Utc>,
    pub path: String,
    pub http_status: u16,
    pub message: String,
}

impl HttpErrorInfo {
    /// Builds an error body stamped with the current time.
    pub fn new(http_status: u16, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            path: path.into(),
            http_status,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_camel_case_fields() {
        let info = HttpErrorInfo::new(404, "/aggregate/2", "No product found for productId: 2");
        let json = serde_json::to_value(&info).unwrap();

        assert_eq!(json["path"], "/aggregate/2");
        assert_eq!(json["httpStatus"], 404);
        assert_eq!(json["message"], "No product found for productId: 2");
        assert!(json["timestamp"].as_str().is_some());
    }
}

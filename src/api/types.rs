//! Request and response types for the control API.

use crate::generator::ControlError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

/// Body of `PUT /v1/control/interval`.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct IntervalRequest {
    pub interval_ms: u64,
}

/// API error response envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub error: ApiErrorBody,
}

/// Error details.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiErrorBody {
    pub message: String,
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiError {
    fn new(message: impl Into<String>, r#type: &str, code: &str) -> Self {
        Self {
            error: ApiErrorBody {
                message: message.into(),
                r#type: r#type.to_string(),
                code: Some(code.to_string()),
            },
        }
    }

    /// Create a bad request error (400).
    pub fn bad_request(message: &str) -> Self {
        Self::new(message, "invalid_request_error", "invalid_request_error")
    }

    /// Create a conflict error (409) for actions blocked while running.
    pub fn conflict(message: &str) -> Self {
        Self::new(message, "invalid_request_error", "generator_running")
    }

    /// Create an internal error (500).
    pub fn internal(message: &str) -> Self {
        Self::new(message, "server_error", "internal_error")
    }

    /// Get the HTTP status code for this error.
    fn status_code(&self) -> StatusCode {
        match self.error.code.as_deref() {
            Some("invalid_request_error") => StatusCode::BAD_REQUEST,
            Some("generator_running") => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ControlError> for ApiError {
    fn from(err: ControlError) -> Self {
        let message = err.to_string();
        match err {
            ControlError::Running => Self::conflict(&message),
            ControlError::InvalidInterval(_) => Self::bad_request(&message),
            ControlError::StoreClosed(_) => Self::internal(&message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::StoreClosed;

    #[test]
    fn test_api_error_serialization() {
        let error = ApiError::conflict("load generator is running; stop it first");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(
            json["error"]["message"],
            "load generator is running; stop it first"
        );
        assert_eq!(json["error"]["type"], "invalid_request_error");
        assert_eq!(json["error"]["code"], "generator_running");
    }

    #[test]
    fn test_control_error_status_codes() {
        assert_eq!(
            ApiError::from(ControlError::Running).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(ControlError::InvalidInterval(0)).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ControlError::StoreClosed(StoreClosed)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_interval_request_deserialize() {
        let req: IntervalRequest = serde_json::from_str(r#"{"interval_ms": 250}"#).unwrap();
        assert_eq!(req.interval_ms, 250);
    }
}

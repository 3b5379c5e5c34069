//! Handler-boundary errors.
//!
//! Every failure leaves a handler as an [`ApiError`] and is rendered as
//! `{"error": "...", "details": ...}` with a matching status.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use parley_core::ParleyError;
use parley_llm::LlmError;

/// Failure leaving a handler: status, message, optional structured details.
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status of the response.
    pub status: StatusCode,
    /// Rendered as `error`.
    pub message: String,
    /// Rendered as `details` when present.
    pub details: Option<Value>,
}

impl ApiError {
    /// Error with a status and message, no details.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    /// Attach a JSON `details` field to the rendered body.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// 400.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 401 with a fixed message.
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    /// 405.
    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    }

    /// 500.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = self.status.as_u16(),
                error = %self.message,
                details = ?self.details,
                "Request failed"
            );
        }
        let mut body = json!({ "error": self.message });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}

impl From<ParleyError> for ApiError {
    fn from(err: ParleyError) -> Self {
        match err {
            ParleyError::InvalidInput(msg) => Self::bad_request(msg),
            ParleyError::Config(_) => {
                Self::internal("Service is misconfigured").with_details(Value::String(err.to_string()))
            }
            other => Self::internal("Store operation failed").with_details(Value::String(other.to_string())),
        }
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        Self::internal("Completion provider failed").with_details(err.details())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_core_errors() {
        let bad = ApiError::from(ParleyError::InvalidInput("NPC identifier must not be empty".into()));
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);

        let cfg = ApiError::from(ParleyError::Config("SERVICE_ACCOUNT_BASE64 is not set".into()));
        assert_eq!(cfg.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(cfg.details.expect("details").as_str().expect("string").contains("SERVICE_ACCOUNT_BASE64"));
    }

    #[test]
    fn upstream_payload_becomes_details() {
        let err = ApiError::from(LlmError::Upstream {
            status: 401,
            body: json!({"error": {"message": "Incorrect API key"}}),
        });
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.details.expect("details")["error"]["message"], "Incorrect API key");
    }
}

//! Completion provider error types.

use thiserror::Error;

/// Errors that can occur during a completion call.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provider answered with a non-success status.
    ///
    /// `body` is the provider's error payload, as JSON when it parsed as
    /// JSON and as a JSON string otherwise.
    #[error("Completion provider returned HTTP {status}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Raw error payload.
        body: serde_json::Value,
    },

    /// HTTP request failed before a response arrived.
    #[error("Completion request failed: {0}")]
    RequestFailed(String),

    /// Success response that could not be decoded.
    #[error("Failed to parse completion response: {0}")]
    ParseError(String),

    /// Request timed out.
    #[error("Completion request timed out after {0}ms")]
    Timeout(u64),

    /// Provider could not be reached.
    #[error("Completion provider unavailable: {0}")]
    Unavailable(String),

    /// Configuration error.
    #[error("Completion provider configuration error: {0}")]
    ConfigError(String),
}

impl LlmError {
    /// Payload worth surfacing to a caller: the provider's own body for
    /// upstream errors, the message otherwise.
    #[must_use]
    pub fn details(&self) -> serde_json::Value {
        match self {
            Self::Upstream { body, .. } => body.clone(),
            other => serde_json::Value::String(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(0)
        } else if err.is_connect() {
            LlmError::Unavailable(err.to_string())
        } else {
            LlmError::RequestFailed(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upstream_details_are_raw_payload() {
        let err = LlmError::Upstream {
            status: 429,
            body: json!({"error": {"message": "Rate limit reached"}}),
        };
        assert_eq!(err.details()["error"]["message"], "Rate limit reached");
        assert_eq!(err.to_string(), "Completion provider returned HTTP 429");
    }

    #[test]
    fn other_details_are_message() {
        let err = LlmError::ConfigError("no api key".into());
        assert_eq!(
            err.details(),
            json!("Completion provider configuration error: no api key")
        );
    }
}

//! Core types for completion requests and responses.

use serde::{Deserialize, Serialize};

/// A request to the completion provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// System prompt (NPC persona, rules).
    pub system: String,
    /// User prompt (memories, player message).
    pub user: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f32,
    /// Request timeout in milliseconds. `None` waits indefinitely.
    pub timeout_ms: Option<u64>,
}

impl CompletionRequest {
    /// Create a request with the default length cap (200) and temperature (0.8).
    #[must_use]
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: 200,
            temperature: 0.8,
            timeout_ms: None,
        }
    }

    /// Set the response length cap.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: Option<u64>) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// A response from the completion provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CompletionResponse {
    /// The generated text.
    pub text: String,
    /// How many tokens were generated.
    pub tokens_generated: u32,
    /// Latency in milliseconds.
    pub latency_ms: u64,
    /// Which model was used.
    pub model: String,
}

//! Completion client: the provider seam and its OpenAI-compatible backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::types::{CompletionRequest, CompletionResponse};

/// Anything that can turn a persona and a message into generated text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate a reply. Called once per request; never retried.
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

/// Client for an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Create a client.
    ///
    /// # Errors
    /// Returns [`LlmError::ConfigError`] if the API key is blank.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::ConfigError("API key is empty".into()));
        }
        Ok(Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        })
    }

    /// Model requests are sent to.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        let mut builder = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body);
        if let Some(timeout_ms) = request.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }

        let start = Instant::now();
        let resp = builder.send().await.map_err(|e| {
            warn!(error = %e, "Completion request failed");
            match request.timeout_ms {
                Some(ms) if e.is_timeout() => LlmError::Timeout(ms),
                _ => LlmError::from(e),
            }
        })?;
        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let status = resp.status();
        if !status.is_success() {
            let raw = resp.text().await.unwrap_or_default();
            let body = serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw));
            warn!(status = status.as_u16(), "Completion provider returned error");
            return Err(LlmError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| LlmError::ParseError(e.to_string()))?;

        let text = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::ParseError("response has no choices[0].message.content".into()))?
            .trim()
            .to_string();

        let tokens = json["usage"]["completion_tokens"]
            .as_u64()
            .and_then(|t| u32::try_from(t).ok())
            .unwrap_or(0);

        debug!(
            model = %self.model,
            tokens,
            latency_ms,
            "Completion received"
        );

        Ok(CompletionResponse {
            text,
            tokens_generated: tokens,
            latency_ms,
            model: json["model"].as_str().unwrap_or(&self.model).to_string(),
        })
    }
}

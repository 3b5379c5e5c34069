//! # parley-llm — Completion Provider Layer for Parley
//!
//! One seam, [`CompletionProvider`]: a system persona and a user message go
//! in, generated text (or the provider's error payload) comes out. The
//! shipped backend is [`OpenAiClient`], which speaks the OpenAI-compatible
//! chat-completions API.
//!
//! Calls are made exactly once. There is no retry and, unless configured,
//! no timeout beyond what the HTTP stack applies.

pub mod client;
pub mod error;
pub mod prompt;
pub mod types;

pub use client::{CompletionProvider, OpenAiClient};
pub use error::LlmError;
pub use types::{CompletionRequest, CompletionResponse};

//! Configuration for the Parley service.
//!
//! Maps directly to `parley.toml`. Environment variables are layered on top
//! by [`ParleyConfig::apply_env`] and always win over the file.

use serde::{Deserialize, Serialize};

use crate::error::{ParleyError, Result};

/// Environment variable holding the maintenance secret.
pub const ENV_CLEANUP_SECRET: &str = "CLEANUP_SECRET";
/// Environment variable overriding the retention keep-count.
pub const ENV_KEEP_MEMORIES: &str = "KEEP_MEMORIES";
/// Environment variable holding the completion provider API key.
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// Environment variable overriding the listen address.
pub const ENV_BIND: &str = "PARLEY_BIND";

/// Top-level Parley configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParleyConfig {
    /// HTTP surface settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Document store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Memory window and prompt settings.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Retention sweep settings.
    #[serde(default)]
    pub retention: RetentionConfig,
    /// Completion provider settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// NPC profiles seeded into the store at startup.
    #[serde(default)]
    pub npcs: Vec<NpcSeed>,
}

impl ParleyConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ParleyError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| ParleyError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Overlay the process environment.
    ///
    /// # Errors
    /// Returns `ParleyError::Config` if `KEEP_MEMORIES` is not a number.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Overlay values produced by `lookup`. Empty values are ignored.
    ///
    /// # Errors
    /// Returns `ParleyError::Config` if `KEEP_MEMORIES` is not a number.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(secret) = get(ENV_CLEANUP_SECRET) {
            self.server.cleanup_secret = Some(secret);
        }
        if let Some(bind) = get(ENV_BIND) {
            self.server.bind = bind;
        }
        if let Some(key) = get(ENV_OPENAI_API_KEY) {
            self.llm.api_key = Some(key);
        }
        if let Some(keep) = get(ENV_KEEP_MEMORIES) {
            self.retention.keep = keep.parse().map_err(|_| {
                ParleyError::Config(format!("{ENV_KEEP_MEMORIES} must be a non-negative integer, got '{keep}'"))
            })?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP surface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Shared secret required by the maintenance endpoint. `None` disables it.
    #[serde(default)]
    pub cleanup_secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cleanup_secret: None,
        }
    }
}

/// Document store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the `SQLite` database file.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Use WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// How long a writer waits on a locked database.
    #[serde(default = "default_5000")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            wal_mode: true,
            busy_timeout_ms: 5000,
        }
    }
}

/// Memory window and prompt assembly settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// How many recent records are shown to the model.
    #[serde(default = "default_10")]
    pub window_size: usize,
    /// Prefix of every stored NPC response.
    #[serde(default = "default_response_label")]
    pub response_label: String,
    /// Memory block used when an NPC has no records yet.
    #[serde(default = "default_empty_placeholder")]
    pub empty_placeholder: String,
    /// Persona used when an NPC has no stored profile.
    #[serde(default = "default_personality")]
    pub default_personality: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            response_label: default_response_label(),
            empty_placeholder: default_empty_placeholder(),
            default_personality: default_personality(),
        }
    }
}

/// Retention sweep settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Records kept per NPC after a sweep.
    #[serde(default = "default_50")]
    pub keep: usize,
    /// Delete an NPC's excess in one transaction instead of one by one.
    #[serde(default)]
    pub batch_deletes: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            keep: 50,
            batch_deletes: false,
        }
    }
}

/// Completion provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API.
    #[serde(default = "default_openai_url")]
    pub base_url: String,
    /// Chat model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Response length cap in tokens.
    #[serde(default = "default_200")]
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(default = "default_0_8")]
    pub temperature: f32,
    /// Optional hard timeout; unset means wait as long as the network does.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    /// API key. Normally supplied through `OPENAI_API_KEY`.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_url(),
            model: default_model(),
            max_tokens: 200,
            temperature: 0.8,
            request_timeout_ms: None,
            api_key: None,
        }
    }
}

/// A profile to upsert at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpcSeed {
    /// NPC identifier.
    pub id: String,
    /// Display name; defaults to the identifier.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Personality description.
    pub personality: String,
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_bind() -> String { "0.0.0.0:3000".to_string() }
fn default_data_dir() -> String { "data".to_string() }
fn default_openai_url() -> String { "https://api.openai.com".to_string() }
fn default_model() -> String { "gpt-4o-mini".to_string() }
fn default_response_label() -> String { "NPC response: ".to_string() }
fn default_empty_placeholder() -> String { "No previous memories.".to_string() }
fn default_personality() -> String {
    "A neutral villager: polite, even-tempered, and brief.".to_string()
}
fn default_0_8() -> f32 { 0.8 }
fn default_10() -> usize { 10 }
fn default_50() -> usize { 50 }
fn default_200() -> u32 { 200 }
fn default_5000() -> u64 { 5000 }

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = ParleyConfig::from_toml("").expect("parse");
        assert_eq!(config.retention.keep, 50);
        assert_eq!(config.memory.window_size, 10);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert!(config.server.cleanup_secret.is_none());
        assert!(config.npcs.is_empty());
    }

    #[test]
    fn partial_sections_and_seeds() {
        let config = ParleyConfig::from_toml(
            r#"
            [retention]
            keep = 5
            batch_deletes = true

            [[npcs]]
            id = "goran"
            display_name = "Goran"
            personality = "gruff but fair"
            "#,
        )
        .expect("parse");
        assert_eq!(config.retention.keep, 5);
        assert!(config.retention.batch_deletes);
        assert_eq!(config.npcs.len(), 1);
        assert_eq!(config.npcs[0].display_name.as_deref(), Some("Goran"));
        assert_eq!(config.llm.max_tokens, 200);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = ParleyConfig::from_toml("[retention]\nkeep = \"many\"").expect_err("must fail");
        assert!(matches!(err, ParleyError::Config(_)));
    }

    #[test]
    fn env_overrides_file() {
        let env: HashMap<&str, &str> = [
            (ENV_CLEANUP_SECRET, "s3cret"),
            (ENV_KEEP_MEMORIES, "12"),
            (ENV_OPENAI_API_KEY, "sk-test"),
            (ENV_BIND, "  "),
        ]
        .into_iter()
        .collect();

        let mut config = ParleyConfig::default();
        config
            .apply_env_with(|k| env.get(k).map(|v| (*v).to_string()))
            .expect("apply");

        assert_eq!(config.server.cleanup_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.retention.keep, 12);
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.server.bind, "0.0.0.0:3000", "blank values are ignored");
    }

    #[test]
    fn bad_keep_count_fails_fast() {
        let mut config = ParleyConfig::default();
        let err = config
            .apply_env_with(|k| (k == ENV_KEEP_MEMORIES).then(|| "fifty".to_string()))
            .expect_err("must fail");
        assert!(matches!(err, ParleyError::Config(_)));
    }
}

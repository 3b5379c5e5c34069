//! Process-wide service handles.
//!
//! The store and the completion client are created on first use and then
//! shared by every request. `OnceCell` guarantees a single initialization even
//! when the first requests race. There is no teardown; the handles live until
//! the process exits.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use parley_core::config::ParleyConfig;
use parley_core::error::Result as CoreResult;
use parley_core::types::{NpcId, NpcProfile};
use parley_core::{DocumentStore, ServiceAccount, SqliteStore};
use parley_llm::{CompletionProvider, LlmError, OpenAiClient};

type StoreFactory = Box<dyn Fn(&ParleyConfig) -> CoreResult<Arc<dyn DocumentStore>> + Send + Sync>;
type ProviderFactory =
    Box<dyn Fn(&ParleyConfig) -> Result<Arc<dyn CompletionProvider>, LlmError> + Send + Sync>;

/// Shared by every handler behind an `Arc`.
pub struct AppState {
    config: ParleyConfig,
    store: OnceCell<Arc<dyn DocumentStore>>,
    provider: OnceCell<Arc<dyn CompletionProvider>>,
    store_factory: StoreFactory,
    provider_factory: ProviderFactory,
}

impl AppState {
    /// Production wiring: SQLite store keyed by the service account in the
    /// environment, OpenAI-compatible provider from `[llm]`.
    pub fn from_config(config: ParleyConfig) -> Self {
        Self {
            config,
            store: OnceCell::new(),
            provider: OnceCell::new(),
            store_factory: Box::new(open_store),
            provider_factory: Box::new(open_provider),
        }
    }

    /// Pre-built handles, mostly for tests.
    pub fn with_services(
        config: ParleyConfig,
        store: Arc<dyn DocumentStore>,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            config,
            store: OnceCell::new_with(Some(store)),
            provider: OnceCell::new_with(Some(provider)),
            store_factory: Box::new(open_store),
            provider_factory: Box::new(open_provider),
        }
    }

    /// Effective configuration, file plus environment.
    pub fn config(&self) -> &ParleyConfig {
        &self.config
    }

    /// Whether any request has touched the store yet.
    pub fn store_initialized(&self) -> bool {
        self.store.initialized()
    }

    /// The store, opening it and seeding `[[npcs]]` profiles on first use.
    pub async fn store(&self) -> CoreResult<Arc<dyn DocumentStore>> {
        let store = self
            .store
            .get_or_try_init(|| async {
                let store = (self.store_factory)(&self.config)?;
                seed_profiles(store.as_ref(), &self.config).await?;
                Ok::<_, parley_core::ParleyError>(store)
            })
            .await?;
        Ok(Arc::clone(store))
    }

    /// The completion provider, created on first use.
    pub async fn provider(&self) -> Result<Arc<dyn CompletionProvider>, LlmError> {
        let provider = self
            .provider
            .get_or_try_init(|| async { (self.provider_factory)(&self.config) })
            .await?;
        Ok(Arc::clone(provider))
    }
}

fn open_store(config: &ParleyConfig) -> CoreResult<Arc<dyn DocumentStore>> {
    let account = ServiceAccount::from_env()?;
    info!(project = %account.project_id, client = %account.client_email, "Loaded service account");
    let store = SqliteStore::open_for_account(&account, &config.store)?;
    Ok(Arc::new(store))
}

fn open_provider(config: &ParleyConfig) -> Result<Arc<dyn CompletionProvider>, LlmError> {
    let api_key = config
        .llm
        .api_key
        .as_deref()
        .ok_or_else(|| LlmError::ConfigError("OPENAI_API_KEY is not set".into()))?;
    let client = OpenAiClient::new(&config.llm.base_url, api_key, &config.llm.model)?;
    info!(model = %client.model(), base_url = %config.llm.base_url, "Completion client ready");
    Ok(Arc::new(client))
}

async fn seed_profiles(store: &dyn DocumentStore, config: &ParleyConfig) -> CoreResult<()> {
    for seed in &config.npcs {
        let id = NpcId::new(&seed.id)?;
        let profile = NpcProfile {
            display_name: seed.display_name.clone().unwrap_or_else(|| id.as_str().to_string()),
            personality: seed.personality.clone(),
            id,
        };
        store.upsert_profile(&profile).await?;
    }
    if !config.npcs.is_empty() {
        info!(count = config.npcs.len(), "Seeded NPC profiles");
    }
    Ok(())
}

//! Shared fixtures for HTTP tests: a scripted completion provider and a
//! store wrapper that counts every call.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use parking_lot::Mutex;
use serde_json::Value;
use tower::ServiceExt;

use parley_core::error::Result as CoreResult;
use parley_core::types::{
    InteractionLogEntry, MemoryId, MemoryRecord, NewInteraction, NewMemory, NpcId, NpcProfile,
};
use parley_core::{DocumentStore, ParleyConfig, ParleyError, SqliteStore};
use parley_llm::{CompletionProvider, CompletionRequest, CompletionResponse, LlmError};
use parley_server::{AppState, router};

pub const SECRET: &str = "s3cret";

/// Provider answering with a fixed reply, or failing with a fixed upstream error.
pub struct ScriptedProvider {
    reply: Option<String>,
    failure: Option<(u16, Value)>,
    pub seen: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(text.to_string()),
            failure: None,
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(status: u16, body: Value) -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            failure: Some((status, body)),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn last(&self) -> CompletionRequest {
        self.seen.lock().last().cloned().expect("provider was called")
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.seen.lock().push(request.clone());
        if let Some((status, body)) = &self.failure {
            return Err(LlmError::Upstream {
                status: *status,
                body: body.clone(),
            });
        }
        Ok(CompletionResponse {
            text: self.reply.clone().unwrap_or_default(),
            tokens_generated: 7,
            latency_ms: 1,
            model: "scripted".into(),
        })
    }
}

/// In-memory SQLite store that counts every operation.
pub struct CountingStore {
    pub inner: SqliteStore,
    ops: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: SqliteStore::open_in_memory().expect("open in-memory store"),
            ops: AtomicUsize::new(0),
        })
    }

    pub fn ops(&self) -> usize {
        self.ops.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.ops.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn get_profile(&self, npc: &NpcId) -> CoreResult<Option<NpcProfile>> {
        self.tick();
        self.inner.get_profile(npc).await
    }

    async fn upsert_profile(&self, profile: &NpcProfile) -> CoreResult<()> {
        self.tick();
        self.inner.upsert_profile(profile).await
    }

    async fn list_npcs(&self) -> CoreResult<Vec<NpcId>> {
        self.tick();
        self.inner.list_npcs().await
    }

    async fn append_memory(&self, npc: &NpcId, memory: NewMemory) -> CoreResult<MemoryRecord> {
        self.tick();
        self.inner.append_memory(npc, memory).await
    }

    async fn recent_memories(&self, npc: &NpcId, limit: Option<usize>) -> CoreResult<Vec<MemoryRecord>> {
        self.tick();
        self.inner.recent_memories(npc, limit).await
    }

    async fn delete_memory(&self, npc: &NpcId, id: MemoryId) -> CoreResult<bool> {
        self.tick();
        self.inner.delete_memory(npc, id).await
    }

    async fn append_interaction(&self, entry: NewInteraction) -> CoreResult<InteractionLogEntry> {
        self.tick();
        self.inner.append_interaction(entry).await
    }

    async fn recent_interactions(&self, limit: usize) -> CoreResult<Vec<InteractionLogEntry>> {
        self.tick();
        self.inner.recent_interactions(limit).await
    }
}

/// SQLite store whose history reads always fail with [`FailingStore::MESSAGE`].
pub struct FailingStore {
    pub inner: SqliteStore,
}

impl FailingStore {
    pub const MESSAGE: &'static str = "disk quota exceeded";

    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: SqliteStore::open_in_memory().expect("open in-memory store"),
        })
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn get_profile(&self, npc: &NpcId) -> CoreResult<Option<NpcProfile>> {
        self.inner.get_profile(npc).await
    }

    async fn upsert_profile(&self, profile: &NpcProfile) -> CoreResult<()> {
        self.inner.upsert_profile(profile).await
    }

    async fn list_npcs(&self) -> CoreResult<Vec<NpcId>> {
        self.inner.list_npcs().await
    }

    async fn append_memory(&self, npc: &NpcId, memory: NewMemory) -> CoreResult<MemoryRecord> {
        self.inner.append_memory(npc, memory).await
    }

    async fn recent_memories(&self, _npc: &NpcId, _limit: Option<usize>) -> CoreResult<Vec<MemoryRecord>> {
        Err(ParleyError::Io(std::io::Error::other(Self::MESSAGE)))
    }

    async fn delete_memory(&self, npc: &NpcId, id: MemoryId) -> CoreResult<bool> {
        self.inner.delete_memory(npc, id).await
    }

    async fn append_interaction(&self, entry: NewInteraction) -> CoreResult<InteractionLogEntry> {
        self.inner.append_interaction(entry).await
    }

    async fn recent_interactions(&self, limit: usize) -> CoreResult<Vec<InteractionLogEntry>> {
        self.inner.recent_interactions(limit).await
    }
}

pub fn test_config() -> ParleyConfig {
    let mut config = ParleyConfig::default();
    config.server.cleanup_secret = Some(SECRET.to_string());
    config
}

pub fn app(config: ParleyConfig, store: Arc<CountingStore>, provider: Arc<ScriptedProvider>) -> Router {
    router(Arc::new(AppState::with_services(config, store, provider)))
}

pub fn app_with_store(
    config: ParleyConfig,
    store: Arc<dyn DocumentStore>,
    provider: Arc<ScriptedProvider>,
) -> Router {
    router(Arc::new(AppState::with_services(config, store, provider)))
}

pub fn npc(raw: &str) -> NpcId {
    NpcId::new(raw).expect("valid npc id")
}

pub fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn bare_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

/// Send one request and decode the JSON body (`Value::Null` when empty).
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, body)
}

//! Deprecated flat interaction log.
//!
//! Predates per-NPC memory: one generic persona, no memory window, and a
//! single log shared by every NPC with no retention. Kept so older clients
//! keep working; new clients use [`crate::interaction`].

use std::sync::Arc;

use axum::{Json, body::Bytes, extract::State};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use parley_core::types::{InteractionLogEntry, NewInteraction};
use parley_llm::{CompletionRequest, prompt};

use crate::error::ApiError;
use crate::interaction::parse_body;
use crate::state::AppState;

/// Entries returned by `GET`.
pub const RECENT_LIMIT: usize = 20;

/// Body of the legacy `POST`. Spanish keys from the first clients still work.
#[derive(Debug, Default, Deserialize)]
pub struct LegacyRequest {
    /// Optional player name.
    #[serde(default, alias = "jugador")]
    pub player: Option<String>,
    /// Required player message.
    #[serde(default, alias = "mensaje")]
    pub message: String,
}

/// Newest-first flat log entries.
#[derive(Debug, Serialize, Deserialize)]
pub struct InteractionList {
    /// Entries, newest first.
    pub interactions: Vec<InteractionLogEntry>,
}

/// `GET` on either interaction route: the latest [`RECENT_LIMIT`] log entries.
pub async fn recent_interactions(State(state): State<Arc<AppState>>) -> Result<Json<InteractionList>, ApiError> {
    let store = state.store().await?;
    let interactions = store.recent_interactions(RECENT_LIMIT).await?;
    info!(count = interactions.len(), "Returned recent interactions");
    Ok(Json(InteractionList { interactions }))
}

/// `POST /api/legacy/interactions`: fixed persona, no memory, one log entry.
pub async fn post_interaction(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<InteractionList>, ApiError> {
    warn!("Legacy interaction endpoint used; prefer POST /api/npc-interaction");
    let request = parse_body::<LegacyRequest>(&body)?;

    if request.message.trim().is_empty() {
        return Err(ApiError::bad_request("message must not be empty"));
    }

    let config = state.config();
    let completion_request = CompletionRequest::new(prompt::LEGACY_SYSTEM, request.message.as_str())
        .with_max_tokens(config.llm.max_tokens)
        .with_temperature(config.llm.temperature)
        .with_timeout(config.llm.request_timeout_ms);
    let completion = state.provider().await?.complete(&completion_request).await?;

    let store = state.store().await?;
    let entry = store
        .append_interaction(NewInteraction {
            player: request.player.filter(|p| !p.trim().is_empty()),
            message: request.message,
            response: completion.text.trim().to_string(),
        })
        .await?;

    Ok(Json(InteractionList {
        interactions: vec![entry],
    }))
}

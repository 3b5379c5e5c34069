//! Memory-aware NPC interaction.
//!
//! One request runs these steps in order, never overlapping:
//! profile lookup → memory window → prompt → completion → memory write.
//! Input is validated before anything else, so a rejected request touches
//! neither the store nor the provider. A successful call writes exactly one
//! `npc_response` record; a failure before that point writes none.

use std::sync::Arc;

use axum::{Json, body::Bytes, extract::State};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use parley_core::types::{MemoryId, MemoryKind, NewMemory, NpcId, NpcProfile};
use parley_core::window::MemoryWindow;
use parley_llm::{CompletionRequest, prompt};

use crate::error::ApiError;
use crate::state::AppState;

/// Body of `POST /api/npc-interaction`. Accepts snake or camel case keys.
#[derive(Debug, Default, Deserialize)]
pub struct InteractionRequest {
    /// Target NPC; must be non-blank.
    #[serde(default, alias = "npcId")]
    pub npc_id: String,
    /// What the player said, embedded in the prompt as sent.
    #[serde(default)]
    pub message: String,
    /// Stored with the resulting memory record.
    #[serde(default, alias = "playerId")]
    pub player_id: Option<String>,
}

/// Successful reply plus the id of the memory record it produced.
#[derive(Debug, Serialize, Deserialize)]
pub struct InteractionReply {
    /// NPC that answered.
    pub npc_id: NpcId,
    /// Generated text, trimmed.
    pub reply: String,
    /// Record written for this reply.
    pub memory_id: MemoryId,
}

/// `POST /api/npc-interaction`.
pub async fn post_interaction(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<InteractionReply>, ApiError> {
    let request = parse_body::<InteractionRequest>(&body)?;
    interact(&state, request).await.map(Json)
}

/// Decode a JSON body. An empty body decodes as the default value.
pub(crate) fn parse_body<T: serde::de::DeserializeOwned + Default>(body: &[u8]) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))
}

/// Run one memory-aware exchange against the shared store and provider.
pub async fn interact(state: &AppState, request: InteractionRequest) -> Result<InteractionReply, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::bad_request("message must not be empty"));
    }
    let npc = NpcId::new(&request.npc_id)?;
    let player_id = request
        .player_id
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());

    let config = state.config();
    let store = state.store().await?;

    let profile = match store.get_profile(&npc).await? {
        Some(profile) => profile,
        None => {
            debug!(npc = %npc, "No stored profile; using default persona");
            NpcProfile::fallback(&npc, &config.memory.default_personality)
        }
    };

    let window = MemoryWindow::load(store.as_ref(), &npc, config.memory.window_size).await?;
    let memories = window.render(&config.memory.empty_placeholder);
    let (system, user) =
        prompt::interaction_prompts(&profile.display_name, &profile.personality, &memories, &request.message);

    let completion_request = CompletionRequest::new(system, user)
        .with_max_tokens(config.llm.max_tokens)
        .with_temperature(config.llm.temperature)
        .with_timeout(config.llm.request_timeout_ms);
    let completion = state.provider().await?.complete(&completion_request).await?;
    let reply = completion.text.trim().to_string();

    let record = store
        .append_memory(
            &npc,
            NewMemory::new(
                MemoryKind::NpcResponse,
                format!("{}{}", config.memory.response_label, reply),
            )
            .with_player(player_id),
        )
        .await?;

    info!(
        npc = %npc,
        window = window.records().len(),
        tokens = completion.tokens_generated,
        latency_ms = completion.latency_ms,
        "NPC replied"
    );

    Ok(InteractionReply {
        npc_id: npc,
        reply,
        memory_id: record.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_is_default_request() {
        let req: InteractionRequest = parse_body(b"  ").expect("parse");
        assert!(req.message.is_empty());
        assert!(req.npc_id.is_empty());
    }

    #[test]
    fn accepts_camel_case_aliases() {
        let req: InteractionRequest =
            parse_body(br#"{"npcId":"goran","message":"hi","playerId":"p1"}"#).expect("parse");
        assert_eq!(req.npc_id, "goran");
        assert_eq!(req.player_id.as_deref(), Some("p1"));
    }

    #[test]
    fn malformed_json_is_bad_request() {
        let err = parse_body::<InteractionRequest>(b"{not json").expect_err("must fail");
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }
}

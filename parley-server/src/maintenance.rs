//! Secret-guarded trigger for the retention sweep.
//!
//! The secret is checked before anything else; an unauthorized call never
//! opens or reads the store.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};

use parley_core::retention::{self, NpcTrim, SweepOptions};

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the shared maintenance secret.
pub const SECRET_HEADER: &str = "x-cleanup-secret";

/// Query string of the cleanup routes.
#[derive(Debug, Default, Deserialize)]
pub struct CleanupParams {
    /// Raw so that a bad value is reported after the secret check.
    pub keep: Option<String>,
}

/// Summary of a completed sweep.
#[derive(Debug, Serialize, Deserialize)]
pub struct CleanupResponse {
    /// Always `true` on success.
    pub ok: bool,
    /// Keep-count applied.
    pub kept: usize,
    /// Records deleted across all NPCs.
    pub deleted: usize,
    /// NPCs examined.
    pub npcs_scanned: usize,
    /// Per-NPC breakdown of NPCs that lost records.
    pub trimmed: Vec<NpcTrim>,
}

/// `GET`/`POST /api/cleanup-memories`: trim every NPC to the keep-count.
///
/// The query is extracted fallibly so that a malformed one is reported only
/// after the secret check.
pub async fn cleanup_memories(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<CleanupParams>, QueryRejection>,
) -> Result<Json<CleanupResponse>, ApiError> {
    authorize(&state, &headers)?;

    let Query(params) = query.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let keep_override = params
        .keep
        .as_deref()
        .map(|raw| {
            raw.trim()
                .parse::<usize>()
                .map_err(|_| ApiError::bad_request(format!("keep must be a non-negative integer, got '{raw}'")))
        })
        .transpose()?;

    let options = SweepOptions::from_config(&state.config().retention, keep_override);
    let store = state.store().await?;
    let report = retention::sweep(store.as_ref(), options).await?;

    Ok(Json(CleanupResponse {
        ok: true,
        kept: report.kept,
        deleted: report.deleted,
        npcs_scanned: report.npcs_scanned,
        trimmed: report.trimmed,
    }))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.config().server.cleanup_secret.as_deref() else {
        tracing::warn!("Cleanup called but no CLEANUP_SECRET is configured");
        return Err(ApiError::unauthorized());
    };
    let supplied = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if supplied != Some(expected) {
        tracing::warn!("Cleanup called with a missing or wrong secret");
        return Err(ApiError::unauthorized());
    }
    Ok(())
}

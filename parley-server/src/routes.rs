//! HTTP routes.

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderName, Method, header},
    routing::{MethodRouter, get},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::maintenance::SECRET_HEADER;
use crate::state::AppState;
use crate::{interaction, legacy, maintenance};

/// Create all HTTP routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/npc-interaction",
            with_defaults(get(legacy::recent_interactions).post(interaction::post_interaction)),
        )
        .route(
            "/api/legacy/interactions",
            with_defaults(get(legacy::recent_interactions).post(legacy::post_interaction)),
        )
        .route(
            "/api/cleanup-memories",
            with_defaults(get(maintenance::cleanup_memories).post(maintenance::cleanup_memories)),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

/// Unsupported methods get a JSON 405. `OPTIONS` never gets this far; the
/// CORS layer answers it.
fn with_defaults(route: MethodRouter<Arc<AppState>>) -> MethodRouter<Arc<AppState>> {
    route.fallback(method_not_allowed)
}

async fn health() -> &'static str {
    "OK"
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(SECRET_HEADER)])
}

//! HTTP endpoints
//!
//! Health/readiness, the character roster, Prometheus metrics, static audio
//! artifacts, and the conversation WebSocket route.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use parla_core::CharacterId;

use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::ws::ws_handler;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let server = &state.settings.server;
    let ws_path = server.ws_path.clone();
    let audio_prefix = server.audio_url_prefix.clone();
    let audio_dir = server.audio_dir.clone();
    let cors_enabled = server.cors_enabled;
    let metrics_enabled = state.settings.observability.metrics_enabled;

    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/api/characters", get(list_characters))
        .route(&ws_path, get(ws_handler))
        .nest_service(&audio_prefix, ServeDir::new(audio_dir));

    if metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    let mut router = router.layer(TraceLayer::new_for_http());
    if cors_enabled {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router.with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let active = state.manager.active_session_count().await.unwrap_or(0);
    crate::metrics::record_active_sessions(active);

    Json(serde_json::json!({
        "status": "ready",
        "activeSessions": active,
    }))
}

/// Character roster for the client picker
async fn list_characters() -> impl IntoResponse {
    let characters: Vec<serde_json::Value> = CharacterId::ALL
        .iter()
        .map(|id| {
            serde_json::json!({
                "id": id.as_str(),
                "name": id.display_name(),
                "language": id.default_language(),
            })
        })
        .collect();

    Json(serde_json::json!({ "characters": characters }))
}

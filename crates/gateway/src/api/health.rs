use axum::extract::State;
use axum::response::{IntoResponse, Json};

use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /v1/health (public, no auth)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Liveness plus backend reachability. Always 200: an unreachable backend
/// degrades decisions to the fail policy, it does not take the API down.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let backend = match state.backend.health().await {
        Ok(_) => serde_json::json!({ "status": "ok" }),
        Err(e) => serde_json::json!({ "status": "unavailable", "error": e.to_string() }),
    };
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "backend": backend,
        "fail_policy": state.config.guard.fail_policy,
        "projects": state.guards.projects().len(),
    }))
}

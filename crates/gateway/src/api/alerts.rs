use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;

use ff_domain::alert::DowngradeDetails;
use ff_domain::budget::ProjectId;
use ff_guard::NOT_CHECKED_MESSAGE;

use crate::state::AppState;

const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// GET /v1/alerts, most recent first.
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(q): Query<AlertsQuery>,
) -> impl IntoResponse {
    let alerts = state
        .guards
        .emitter()
        .log()
        .recent(q.limit.unwrap_or(DEFAULT_LIMIT));
    Json(serde_json::json!({
        "count": alerts.len(),
        "alerts": alerts,
    }))
}

/// POST /v1/projects/:id/alerts/downgrade: the caller applied a downgrade.
pub async fn downgrade_applied(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(details): Json<DowngradeDetails>,
) -> impl IntoResponse {
    let event = state
        .guards
        .emitter()
        .trigger_downgrade_notification(&ProjectId::from(id), &details);
    (StatusCode::CREATED, Json(event))
}

#[derive(Debug, Default, Deserialize)]
pub struct AbortBody {
    #[serde(default)]
    pub reason: Option<String>,
}

/// POST /v1/projects/:id/alerts/abort: a block actually stopped an
/// operation. Without a `reason` the guard's current message is used.
pub async fn operation_aborted(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AbortBody>,
) -> impl IntoResponse {
    let project = ProjectId::from(id);
    let reason = match body.reason.filter(|r| !r.trim().is_empty()) {
        Some(reason) => reason,
        None => state
            .guards
            .lookup(&project)
            .map(|guard| guard.blocked_message())
            .unwrap_or_else(|| NOT_CHECKED_MESSAGE.to_owned()),
    };
    let event = state
        .guards
        .emitter()
        .trigger_abort_notification(&project, &reason);
    (StatusCode::CREATED, Json(event))
}

use axum::extract::{Path, State};
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use ff_domain::budget::{
    BudgetStatus, EnforcementDecision, EnforcementMode, OperationRequest, ProjectId,
};
use ff_guard::BudgetGuard;

use super::budget::refreshed_guard;
use super::error::ApiError;
use crate::state::AppState;

/// What the web client needs to gate its AI actions.
#[derive(Debug, Serialize)]
pub struct GuardViewResponse {
    pub project_id: ProjectId,
    pub blocked: bool,
    pub message: String,
    pub mode: EnforcementMode,
    pub over_budget: bool,
    pub at_risk: bool,
    pub status: Option<BudgetStatus>,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl GuardViewResponse {
    fn from_guard(guard: &BudgetGuard) -> Self {
        let view = guard.view();
        Self {
            project_id: guard.project_id().clone(),
            blocked: guard.is_operation_blocked(),
            message: guard.blocked_message(),
            mode: guard.enforcement_mode(),
            over_budget: guard.is_over_budget(),
            at_risk: guard.is_at_risk(),
            status: view.as_ref().map(|v| v.summary.status),
            refreshed_at: view.as_ref().map(|v| v.refreshed_at),
            last_error: guard.last_error(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /v1/projects/:id/guard
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Current façade state. Reads the backend only when the project has
/// never been read; afterwards the refresh loop keeps it current.
pub async fn get_guard(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GuardViewResponse>, ApiError> {
    let project = ProjectId::from(id);
    let guard = match state.guards.lookup(&project).filter(|g| g.view().is_some()) {
        Some(guard) => guard,
        None => refreshed_guard(&state, &project).await?.0,
    };
    Ok(Json(GuardViewResponse::from_guard(&guard)))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/projects/:id/guard/evaluate
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Refresh, then decide. A `block` is a normal 200 answer with
/// `allowed: false`; the caller decides what to tell its user.
pub async fn evaluate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<OperationRequest>,
) -> Result<Json<EnforcementDecision>, ApiError> {
    let project = ProjectId::from(id);
    let (guard, _) = refreshed_guard(&state, &project).await?;
    Ok(Json(guard.evaluate(&request)))
}

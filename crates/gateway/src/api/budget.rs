use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Json;

use ff_domain::budget::{BudgetSummary, ProjectId};
use ff_domain::error::Error;
use ff_guard::BudgetGuard;

use super::error::ApiError;
use crate::state::AppState;

/// Refresh `project`'s guard. A transient failure keeps whatever view the
/// guard already has; an unknown project is evicted from the registry.
pub(crate) async fn refreshed_guard(
    state: &AppState,
    project: &ProjectId,
) -> Result<(Arc<BudgetGuard>, Option<Error>), ApiError> {
    let guard = state.guards.get(project);
    match guard.refresh().await {
        Ok(_) => Ok((guard, None)),
        Err(e) if e.is_transient() => {
            tracing::warn!(project_id = %project, error = %e, "budget refresh failed, serving last known state");
            Ok((guard, Some(e)))
        }
        Err(e) => {
            if matches!(e, Error::NotFound(_)) {
                state.guards.remove(project);
            }
            Err(e.into())
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /v1/projects/:id/budget
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn get_budget(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BudgetSummary>, ApiError> {
    let project = ProjectId::from(id);
    let (guard, failure) = refreshed_guard(&state, &project).await?;
    match (guard.summary(), failure) {
        (Some(summary), _) => Ok(Json(summary)),
        (None, Some(e)) => Err(e.into()),
        (None, None) => Err(Error::Other(format!("no budget summary for {project}")).into()),
    }
}

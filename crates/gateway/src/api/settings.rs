use axum::extract::{Path, State};
use axum::response::Json;

use ff_domain::budget::{BudgetSettings, BudgetSettingsPatch, ProjectId};

use super::auth::AdminGuard;
use super::error::ApiError;
use crate::state::AppState;

/// PUT /v1/projects/:id/settings (admin). Validates, persists, then
/// refreshes the project's guard.
pub async fn update_settings(
    _admin: AdminGuard,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<BudgetSettingsPatch>,
) -> Result<Json<BudgetSettings>, ApiError> {
    let project = ProjectId::from(id);
    let saved = state.guards.update_settings(&project, &patch).await?;
    tracing::info!(
        project_id = %project,
        monthly_budget_usd = saved.monthly_budget_usd,
        enforcement_mode = %saved.enforcement_mode,
        "budget settings updated"
    );
    Ok(Json(saved))
}

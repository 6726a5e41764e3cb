//! The `BudgetBackend` trait defines the interface to the hosted backend
//! that owns budget settings and the spend ledger (REST, in-memory, test).

use async_trait::async_trait;
use ff_domain::budget::{BudgetSettings, BudgetSettingsPatch, ProjectId};
use ff_domain::error::Result;

use crate::types::SpendSummaryDto;

/// Abstraction over the hosted backend's budget API surface.
///
/// Implementations map "no such project" to `Error::NotFound` and
/// network/5xx failures to `Error::Transient`.
#[async_trait]
pub trait BudgetBackend: Send + Sync {
    /// Month-to-date spend (GET /functions/v1/budget/{projectId}/summary).
    async fn spend_summary(&self, project: &ProjectId) -> Result<SpendSummaryDto>;

    /// Saved settings (GET /functions/v1/budget/{projectId}/settings).
    /// `NotFound` when the project never saved any.
    async fn settings(&self, project: &ProjectId) -> Result<BudgetSettings>;

    /// Admin-only write (PUT /functions/v1/budget/{projectId}/settings).
    async fn update_settings(
        &self,
        project: &ProjectId,
        patch: &BudgetSettingsPatch,
    ) -> Result<BudgetSettings>;

    /// Backend liveness (GET /functions/v1/health).
    async fn health(&self) -> Result<serde_json::Value>;
}

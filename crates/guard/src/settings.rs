//! Budget settings writes.

use std::borrow::Cow;
use std::sync::Arc;

use ff_backend::BudgetBackend;
use ff_domain::budget::{BudgetSettings, BudgetSettingsPatch, ProjectId};
use ff_domain::error::{Error, Result};
use ff_domain::trace::TraceEvent;

/// Validates and persists settings patches.
///
/// Invalid patches never reach the backend. The first write for a project
/// that never saved settings carries the plan default budget unless the
/// patch sets one, so a mode-only patch keeps the budget the guard was
/// already enforcing.
pub struct SettingsService {
    backend: Arc<dyn BudgetBackend>,
    default_monthly_budget_usd: f64,
}

impl SettingsService {
    pub fn new(backend: Arc<dyn BudgetBackend>, default_monthly_budget_usd: f64) -> Self {
        Self {
            backend,
            default_monthly_budget_usd,
        }
    }

    pub async fn update(
        &self,
        project: &ProjectId,
        patch: &BudgetSettingsPatch,
    ) -> Result<BudgetSettings> {
        patch.validate()?;
        let patch = self.with_plan_default(project, patch).await?;
        let saved = self.backend.update_settings(project, &patch).await?;

        TraceEvent::SettingsUpdated {
            project_id: project.to_string(),
            monthly_budget_usd: saved.monthly_budget_usd,
            enforcement_mode: saved.enforcement_mode.to_string(),
        }
        .emit();
        Ok(saved)
    }

    async fn with_plan_default<'a>(
        &self,
        project: &ProjectId,
        patch: &'a BudgetSettingsPatch,
    ) -> Result<Cow<'a, BudgetSettingsPatch>> {
        if patch.monthly_budget_usd.is_some() {
            return Ok(Cow::Borrowed(patch));
        }
        match self.backend.settings(project).await {
            Ok(_) => Ok(Cow::Borrowed(patch)),
            // Unknown projects surface as NotFound from the write below.
            Err(Error::NotFound(_)) => Ok(Cow::Owned(BudgetSettingsPatch {
                monthly_budget_usd: Some(self.default_monthly_budget_usd),
                ..patch.clone()
            })),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff_backend::InMemoryBudgetBackend;
    use ff_domain::budget::EnforcementMode;
    use ff_domain::error::Error;

    fn service() -> (SettingsService, Arc<InMemoryBudgetBackend>) {
        let backend = Arc::new(InMemoryBudgetBackend::new());
        backend.insert_project("p1".into(), 0.0, None);
        (SettingsService::new(backend.clone(), 50.0), backend)
    }

    #[tokio::test]
    async fn negative_budget_is_rejected_before_the_backend() {
        let (svc, backend) = service();
        backend.set_unavailable(true);

        let patch = BudgetSettingsPatch {
            monthly_budget_usd: Some(-1.0),
            ..Default::default()
        };
        let err = svc.update(&"p1".into(), &patch).await.unwrap_err();
        // Validation, not the backend outage.
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn empty_patch_is_rejected() {
        let (svc, _) = service();
        let err = svc
            .update(&"p1".into(), &BudgetSettingsPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn valid_patch_is_persisted() {
        let (svc, backend) = service();
        let patch = BudgetSettingsPatch {
            monthly_budget_usd: Some(250.0),
            max_cost_per_query_usd: Some(Some(2.0)),
            enforcement_mode: Some(EnforcementMode::AutoDowngrade),
        };
        let saved = svc.update(&"p1".into(), &patch).await.unwrap();
        assert_eq!(saved.monthly_budget_usd, 250.0);
        assert_eq!(saved.max_cost_per_query_usd, Some(2.0));

        let stored = backend.settings(&"p1".into()).await.unwrap();
        assert_eq!(stored, saved);
    }

    #[tokio::test]
    async fn explicit_null_clears_the_cap() {
        let (svc, _) = service();
        let set = BudgetSettingsPatch {
            max_cost_per_query_usd: Some(Some(2.0)),
            ..Default::default()
        };
        svc.update(&"p1".into(), &set).await.unwrap();

        let clear = BudgetSettingsPatch {
            max_cost_per_query_usd: Some(None),
            ..Default::default()
        };
        let saved = svc.update(&"p1".into(), &clear).await.unwrap();
        assert_eq!(saved.max_cost_per_query_usd, None);
    }

    #[tokio::test]
    async fn mode_only_patch_keeps_the_plan_default_budget() {
        let (svc, _) = service();
        let patch = BudgetSettingsPatch {
            enforcement_mode: Some(EnforcementMode::Abort),
            ..Default::default()
        };
        let saved = svc.update(&"p1".into(), &patch).await.unwrap();
        assert_eq!(saved.monthly_budget_usd, 50.0);
        assert_eq!(saved.enforcement_mode, EnforcementMode::Abort);

        // Once settings exist, a mode-only patch leaves the saved budget alone.
        let raise = BudgetSettingsPatch {
            monthly_budget_usd: Some(80.0),
            ..Default::default()
        };
        svc.update(&"p1".into(), &raise).await.unwrap();
        let warn = BudgetSettingsPatch {
            enforcement_mode: Some(EnforcementMode::Warn),
            ..Default::default()
        };
        let saved = svc.update(&"p1".into(), &warn).await.unwrap();
        assert_eq!(saved.monthly_budget_usd, 80.0);
    }

    #[tokio::test]
    async fn unknown_project_is_not_found() {
        let (svc, _) = service();
        let patch = BudgetSettingsPatch {
            monthly_budget_usd: Some(10.0),
            ..Default::default()
        };
        let err = svc.update(&"ghost".into(), &patch).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}

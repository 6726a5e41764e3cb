//! Budget snapshot reader: month-to-date spend + settings for one project.

use std::sync::Arc;

use chrono::Utc;

use ff_backend::BudgetBackend;
use ff_domain::budget::{BudgetSettings, BudgetSnapshot, ProjectId};
use ff_domain::error::{Error, Result};
use ff_domain::trace::TraceEvent;

/// Read-only view onto the backend for guard purposes.
pub struct SnapshotReader {
    backend: Arc<dyn BudgetBackend>,
    default_monthly_budget_usd: f64,
}

impl SnapshotReader {
    pub fn new(backend: Arc<dyn BudgetBackend>, default_monthly_budget_usd: f64) -> Self {
        Self {
            backend,
            default_monthly_budget_usd,
        }
    }

    pub fn backend(&self) -> &Arc<dyn BudgetBackend> {
        &self.backend
    }

    /// Read the current snapshot for `project`.
    ///
    /// * Unknown project → `Error::NotFound`.
    /// * Known project without saved settings → plan defaults
    ///   (`default_monthly_budget_usd`, mode `warn`), `settings_defaulted`.
    /// * Network/backend failure → `Error::Transient`, untouched.
    pub async fn read_snapshot(&self, project: &ProjectId) -> Result<BudgetSnapshot> {
        let (spend, settings) = tokio::join!(
            self.backend.spend_summary(project),
            self.backend.settings(project),
        );

        // The spend endpoint is authoritative for project existence.
        let spend = spend?;

        let (settings, settings_defaulted) = match settings {
            Ok(settings) => (settings, false),
            Err(Error::NotFound(_)) => {
                tracing::debug!(project_id = %project, "no saved budget settings, using defaults");
                (
                    BudgetSettings::defaults_for(project.clone(), self.default_monthly_budget_usd),
                    true,
                )
            }
            Err(e) => return Err(e),
        };

        TraceEvent::SnapshotRead {
            project_id: project.to_string(),
            spending_usd: spend.current_spending_usd,
            settings_defaulted,
        }
        .emit();

        Ok(BudgetSnapshot {
            project_id: project.clone(),
            spending_usd: spend.current_spending_usd,
            settings,
            settings_defaulted,
            read_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff_backend::InMemoryBudgetBackend;
    use ff_domain::budget::EnforcementMode;

    fn reader(backend: Arc<InMemoryBudgetBackend>) -> SnapshotReader {
        SnapshotReader::new(backend, 50.0)
    }

    #[tokio::test]
    async fn missing_settings_fall_back_to_plan_defaults() {
        let backend = Arc::new(InMemoryBudgetBackend::new());
        backend.insert_project("p1".into(), 12.5, None);

        let snap = reader(backend).read_snapshot(&"p1".into()).await.unwrap();
        assert!(snap.settings_defaulted);
        assert_eq!(snap.spending_usd, 12.5);
        assert_eq!(snap.settings.monthly_budget_usd, 50.0);
        assert_eq!(snap.settings.enforcement_mode, EnforcementMode::Warn);
        assert_eq!(snap.settings.project_id.as_str(), "p1");
    }

    #[tokio::test]
    async fn saved_settings_are_used_verbatim() {
        let backend = Arc::new(InMemoryBudgetBackend::new());
        let mut settings = BudgetSettings::defaults_for("p1".into(), 500.0);
        settings.enforcement_mode = EnforcementMode::Abort;
        backend.insert_project("p1".into(), 450.0, Some(settings.clone()));

        let snap = reader(backend).read_snapshot(&"p1".into()).await.unwrap();
        assert!(!snap.settings_defaulted);
        assert_eq!(snap.settings, settings);
    }

    #[tokio::test]
    async fn unknown_project_is_not_found() {
        let backend = Arc::new(InMemoryBudgetBackend::new());
        let err = reader(backend).read_snapshot(&"ghost".into()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn outage_propagates_as_transient() {
        let backend = Arc::new(InMemoryBudgetBackend::new());
        backend.insert_project("p1".into(), 1.0, None);
        backend.set_unavailable(true);

        let err = reader(backend).read_snapshot(&"p1".into()).await.unwrap_err();
        assert!(err.is_transient());
    }
}

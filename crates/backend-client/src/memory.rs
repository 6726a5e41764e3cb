//! Process-local [`BudgetBackend`] used for demos, the `memory` transport
//! and tests.
//!
//! Projects must be registered before they can be read; a registered
//! project without settings answers `NotFound` on `settings()` exactly
//! like the hosted backend does for a project that never saved any.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use ff_domain::budget::{BudgetSettings, BudgetSettingsPatch, ProjectId};
use ff_domain::error::{Error, Result};

use crate::provider::BudgetBackend;
use crate::types::SpendSummaryDto;

struct ProjectRecord {
    spending_usd: f64,
    settings: Option<BudgetSettings>,
}

/// In-memory stand-in for the hosted backend.
pub struct InMemoryBudgetBackend {
    projects: RwLock<HashMap<ProjectId, ProjectRecord>>,
    unavailable: AtomicBool,
    latency: RwLock<Option<Duration>>,
    summary_reads: AtomicU64,
}

impl Default for InMemoryBudgetBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBudgetBackend {
    pub fn new() -> Self {
        Self {
            projects: RwLock::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
            latency: RwLock::new(None),
            summary_reads: AtomicU64::new(0),
        }
    }

    /// Register a project with month-to-date spend and optional settings.
    pub fn insert_project(
        &self,
        project: ProjectId,
        spending_usd: f64,
        settings: Option<BudgetSettings>,
    ) {
        self.projects.write().insert(
            project,
            ProjectRecord {
                spending_usd,
                settings,
            },
        );
    }

    /// Add spend to a registered project. Returns `false` if unknown.
    pub fn record_spend(&self, project: &ProjectId, cost_usd: f64) -> bool {
        match self.projects.write().get_mut(project) {
            Some(record) => {
                record.spending_usd += cost_usd;
                true
            }
            None => false,
        }
    }

    /// Simulate a backend outage: every call fails with `Transient`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay every call by `latency` (uses `tokio::time`, so paused-clock
    /// tests stay deterministic).
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write() = latency;
    }

    /// Number of `spend_summary` calls served so far.
    pub fn summary_reads(&self) -> u64 {
        self.summary_reads.load(Ordering::SeqCst)
    }

    async fn simulate_io(&self) -> Result<()> {
        let latency = *self.latency.read();
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::Transient("in-memory backend marked unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl BudgetBackend for InMemoryBudgetBackend {
    async fn spend_summary(&self, project: &ProjectId) -> Result<SpendSummaryDto> {
        self.summary_reads.fetch_add(1, Ordering::SeqCst);
        self.simulate_io().await?;

        let projects = self.projects.read();
        let record = projects
            .get(project)
            .ok_or_else(|| Error::NotFound(format!("project {project}")))?;
        Ok(SpendSummaryDto {
            current_spending_usd: record.spending_usd,
            monthly_budget_usd: record.settings.as_ref().map(|s| s.monthly_budget_usd),
            period_start: Some(Utc::now().date_naive()),
        })
    }

    async fn settings(&self, project: &ProjectId) -> Result<BudgetSettings> {
        self.simulate_io().await?;

        let projects = self.projects.read();
        let record = projects
            .get(project)
            .ok_or_else(|| Error::NotFound(format!("project {project}")))?;
        record
            .settings
            .clone()
            .ok_or_else(|| Error::NotFound(format!("budget settings for {project}")))
    }

    async fn update_settings(
        &self,
        project: &ProjectId,
        patch: &BudgetSettingsPatch,
    ) -> Result<BudgetSettings> {
        self.simulate_io().await?;

        let mut projects = self.projects.write();
        let record = projects
            .get_mut(project)
            .ok_or_else(|| Error::NotFound(format!("project {project}")))?;
        let current = record
            .settings
            .clone()
            .unwrap_or_else(|| BudgetSettings::defaults_for(project.clone(), 0.0));
        let next = patch.apply(&current);
        record.settings = Some(next.clone());
        Ok(next)
    }

    async fn health(&self) -> Result<serde_json::Value> {
        self.simulate_io().await?;
        Ok(serde_json::json!({
            "status": "ok",
            "transport": "memory",
            "projects": self.projects.read().len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff_domain::budget::EnforcementMode;

    #[tokio::test]
    async fn unknown_project_is_not_found() {
        let backend = InMemoryBudgetBackend::new();
        let err = backend.spend_summary(&"ghost".into()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn registered_project_without_settings_is_not_found_on_settings() {
        let backend = InMemoryBudgetBackend::new();
        backend.insert_project("p1".into(), 12.0, None);

        let summary = backend.spend_summary(&"p1".into()).await.unwrap();
        assert_eq!(summary.current_spending_usd, 12.0);
        assert!(matches!(
            backend.settings(&"p1".into()).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_creates_then_patches_settings() {
        let backend = InMemoryBudgetBackend::new();
        backend.insert_project("p1".into(), 0.0, None);

        let patch = BudgetSettingsPatch {
            monthly_budget_usd: Some(200.0),
            enforcement_mode: Some(EnforcementMode::Abort),
            ..Default::default()
        };
        let saved = backend.update_settings(&"p1".into(), &patch).await.unwrap();
        assert_eq!(saved.monthly_budget_usd, 200.0);
        assert_eq!(saved.enforcement_mode, EnforcementMode::Abort);

        let read = backend.settings(&"p1".into()).await.unwrap();
        assert_eq!(read, saved);
    }

    #[tokio::test]
    async fn outage_is_transient_and_still_counted() {
        let backend = InMemoryBudgetBackend::new();
        backend.insert_project("p1".into(), 1.0, None);
        backend.set_unavailable(true);

        let err = backend.spend_summary(&"p1".into()).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(backend.summary_reads(), 1);

        backend.set_unavailable(false);
        assert!(backend.spend_summary(&"p1".into()).await.is_ok());
    }

    #[tokio::test]
    async fn record_spend_accumulates() {
        let backend = InMemoryBudgetBackend::new();
        backend.insert_project("p1".into(), 1.5, None);
        assert!(backend.record_spend(&"p1".into(), 2.0));
        assert!(!backend.record_spend(&"p2".into(), 2.0));

        let summary = backend.spend_summary(&"p1".into()).await.unwrap();
        assert!((summary.current_spending_usd - 3.5).abs() < 1e-9);
    }
}

//! One [`BudgetGuard`] per project, created on first use.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use ff_backend::BudgetBackend;
use ff_domain::budget::{BudgetSettings, BudgetSettingsPatch, ProjectId};
use ff_domain::config::GuardConfig;
use ff_domain::error::Result;

use crate::alerts::{AlertEmitter, AlertLedger, AlertLog};
use crate::clock::{Clock, SystemClock};
use crate::engine::GuardPolicy;
use crate::guard::BudgetGuard;
use crate::poller::{run_refresh_loop, RefreshExit};
use crate::settings::SettingsService;
use crate::snapshot::SnapshotReader;

struct Entry {
    guard: Arc<BudgetGuard>,
    stop: CancellationToken,
}

pub struct GuardRegistry {
    reader: Arc<SnapshotReader>,
    policy: Arc<GuardPolicy>,
    emitter: Arc<AlertEmitter>,
    settings: SettingsService,
    clock: Arc<dyn Clock>,
    refresh_interval: Option<Duration>,
    shutdown: CancellationToken,
    guards: Arc<RwLock<HashMap<ProjectId, Entry>>>,
}

impl GuardRegistry {
    pub fn new(backend: Arc<dyn BudgetBackend>, cfg: &GuardConfig) -> Self {
        let emitter = AlertEmitter::new(
            Arc::new(AlertLedger::new()),
            Arc::new(AlertLog::new(cfg.alert_log_capacity)),
        );
        Self {
            reader: Arc::new(SnapshotReader::new(
                Arc::clone(&backend),
                cfg.default_monthly_budget_usd,
            )),
            policy: Arc::new(GuardPolicy::from_config(cfg)),
            emitter: Arc::new(emitter),
            settings: SettingsService::new(backend, cfg.default_monthly_budget_usd),
            clock: Arc::new(SystemClock),
            refresh_interval: (cfg.refresh_interval_secs > 0)
                .then(|| Duration::from_secs(cfg.refresh_interval_secs)),
            shutdown: CancellationToken::new(),
            guards: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Override the calendar source. Affects guards created afterwards.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Disable background polling (CLI one-shots, tests).
    pub fn without_polling(mut self) -> Self {
        self.refresh_interval = None;
        self
    }

    pub fn emitter(&self) -> &Arc<AlertEmitter> {
        &self.emitter
    }

    pub fn policy(&self) -> &Arc<GuardPolicy> {
        &self.policy
    }

    /// Existing guard for `project`, without creating one.
    pub fn lookup(&self, project: &ProjectId) -> Option<Arc<BudgetGuard>> {
        self.guards
            .read()
            .get(project)
            .map(|entry| Arc::clone(&entry.guard))
    }

    /// Guard for `project`, creating it (and its refresh loop) on first use.
    ///
    /// Must be called from within a tokio runtime when polling is enabled.
    /// A guard whose scheduled poll finds the project unknown is evicted.
    pub fn get(&self, project: &ProjectId) -> Arc<BudgetGuard> {
        if let Some(guard) = self.lookup(project) {
            return guard;
        }

        let mut guards = self.guards.write();
        // Another caller may have won the race between the two locks.
        if let Some(entry) = guards.get(project) {
            return Arc::clone(&entry.guard);
        }

        let guard = Arc::new(
            BudgetGuard::new(
                project.clone(),
                Arc::clone(&self.reader),
                Arc::clone(&self.policy),
                Arc::clone(&self.emitter),
            )
            .with_clock(Arc::clone(&self.clock)),
        );
        let stop = self.shutdown.child_token();
        guards.insert(
            project.clone(),
            Entry {
                guard: Arc::clone(&guard),
                stop: stop.clone(),
            },
        );
        drop(guards);

        if let Some(every) = self.refresh_interval {
            let guards = Arc::downgrade(&self.guards);
            let polled = Arc::clone(&guard);
            tokio::spawn(async move {
                if run_refresh_loop(Arc::clone(&polled), every, stop).await
                    == RefreshExit::ProjectGone
                {
                    if let Some(guards) = guards.upgrade() {
                        evict(&guards, &polled);
                    }
                }
            });
        }
        tracing::debug!(project_id = %project, "budget guard registered");
        guard
    }

    /// Projects with a live guard, sorted.
    pub fn projects(&self) -> Vec<ProjectId> {
        let mut ids: Vec<ProjectId> = self.guards.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Drop the guard for `project` and stop its refresh loop, e.g. after
    /// the backend reported the project as unknown.
    pub fn remove(&self, project: &ProjectId) -> bool {
        match self.guards.write().remove(project) {
            Some(entry) => {
                entry.stop.cancel();
                true
            }
            None => false,
        }
    }

    /// Persist a settings patch, then refresh the project's guard so the
    /// next decision sees the new settings.
    ///
    /// A refresh failure after a successful write is logged, not returned.
    pub async fn update_settings(
        &self,
        project: &ProjectId,
        patch: &BudgetSettingsPatch,
    ) -> Result<BudgetSettings> {
        let saved = self.settings.update(project, patch).await?;
        if let Err(e) = self.get(project).refresh().await {
            tracing::warn!(project_id = %project, error = %e, "refresh after settings update failed");
        }
        Ok(saved)
    }

    /// Stop every refresh loop spawned by this registry.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

/// Remove `guard`'s entry unless a newer guard already replaced it.
fn evict(guards: &RwLock<HashMap<ProjectId, Entry>>, guard: &Arc<BudgetGuard>) {
    let mut guards = guards.write();
    let project = guard.project_id();
    if guards
        .get(project)
        .is_some_and(|entry| Arc::ptr_eq(&entry.guard, guard))
    {
        if let Some(entry) = guards.remove(project) {
            entry.stop.cancel();
        }
        tracing::debug!(project_id = %project, "budget guard evicted");
    }
}

impl Drop for GuardRegistry {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

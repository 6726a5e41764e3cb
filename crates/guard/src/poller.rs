//! Background refresh loop for one guard.

use std::sync::Arc;
use std::time::Duration;

use ff_domain::error::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::guard::BudgetGuard;

/// Why a refresh loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshExit {
    Shutdown,
    /// The backend no longer knows the project.
    ProjectGone,
}

/// Spawn [`run_refresh_loop`] on the runtime.
pub fn spawn_refresh_loop(
    guard: Arc<BudgetGuard>,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<RefreshExit> {
    tokio::spawn(run_refresh_loop(guard, every, shutdown))
}

/// Poll `guard` every `every` until `shutdown` fires or the backend answers
/// `NotFound` for the project.
///
/// The first tick is immediate, so a freshly registered guard gets its
/// initial snapshot without waiting a full interval. Ticks missed while a
/// slow read was in flight are skipped, not replayed.
pub async fn run_refresh_loop(
    guard: Arc<BudgetGuard>,
    every: Duration,
    shutdown: CancellationToken,
) -> RefreshExit {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let exit = loop {
        tokio::select! {
            _ = shutdown.cancelled() => break RefreshExit::Shutdown,
            _ = interval.tick() => {}
        }

        let outcome = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break RefreshExit::Shutdown,
            outcome = guard.poll() => outcome,
        };

        match outcome {
            Some(Ok(view)) => tracing::debug!(
                project_id = %guard.project_id(),
                status = %view.summary.status,
                "scheduled budget refresh"
            ),
            Some(Err(Error::NotFound(e))) => {
                tracing::info!(
                    project_id = %guard.project_id(),
                    error = %e,
                    "project unknown to the backend; stopping refresh loop"
                );
                break RefreshExit::ProjectGone;
            }
            Some(Err(e)) => tracing::warn!(
                project_id = %guard.project_id(),
                error = %e,
                "scheduled budget refresh failed"
            ),
            None => tracing::debug!(
                project_id = %guard.project_id(),
                "scheduled budget refresh superseded by manual refresh"
            ),
        }
    };

    tracing::debug!(project_id = %guard.project_id(), ?exit, "budget refresh loop stopped");
    exit
}

#[cfg(test)]
mod tests {
    use super::*;

    use ff_backend::InMemoryBudgetBackend;

    use crate::alerts::{AlertEmitter, AlertLedger, AlertLog};
    use crate::engine::GuardPolicy;
    use crate::snapshot::SnapshotReader;

    fn guard(backend: Arc<InMemoryBudgetBackend>) -> Arc<BudgetGuard> {
        Arc::new(BudgetGuard::new(
            "p1".into(),
            Arc::new(SnapshotReader::new(backend, 50.0)),
            Arc::new(GuardPolicy::default()),
            Arc::new(AlertEmitter::new(
                Arc::new(AlertLedger::new()),
                Arc::new(AlertLog::new(8)),
            )),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn polls_on_every_tick_until_cancelled() {
        let backend = Arc::new(InMemoryBudgetBackend::new());
        backend.insert_project("p1".into(), 5.0, None);
        let guard = guard(Arc::clone(&backend));
        let token = CancellationToken::new();

        let handle = spawn_refresh_loop(Arc::clone(&guard), Duration::from_secs(45), token.clone());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(backend.summary_reads(), 1);
        assert!(guard.view().is_some());

        tokio::time::sleep(Duration::from_secs(90)).await;
        assert_eq!(backend.summary_reads(), 3);

        token.cancel();
        assert_eq!(handle.await.unwrap(), RefreshExit::Shutdown);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(backend.summary_reads(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_an_in_flight_read() {
        let backend = Arc::new(InMemoryBudgetBackend::new());
        backend.insert_project("p1".into(), 5.0, None);
        backend.set_latency(Some(Duration::from_secs(30)));
        let guard = guard(Arc::clone(&backend));
        let token = CancellationToken::new();

        let handle = spawn_refresh_loop(Arc::clone(&guard), Duration::from_secs(45), token.clone());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(backend.summary_reads(), 1);

        token.cancel();
        handle.await.unwrap();
        assert!(guard.view().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn backend_failures_do_not_stop_the_loop() {
        let backend = Arc::new(InMemoryBudgetBackend::new());
        backend.insert_project("p1".into(), 5.0, None);
        backend.set_unavailable(true);
        let guard = guard(Arc::clone(&backend));
        let token = CancellationToken::new();

        let handle = spawn_refresh_loop(Arc::clone(&guard), Duration::from_secs(10), token.clone());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(guard.last_error().is_some());

        backend.set_unavailable(false);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(guard.view().is_some());
        assert!(guard.last_error().is_none());

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_project_ends_the_loop() {
        let backend = Arc::new(InMemoryBudgetBackend::new());
        let guard = guard(Arc::clone(&backend));

        let handle = spawn_refresh_loop(guard, Duration::from_secs(10), CancellationToken::new());
        assert_eq!(handle.await.unwrap(), RefreshExit::ProjectGone);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(backend.summary_reads(), 1);
    }
}

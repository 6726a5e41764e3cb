//! Guard façade: the single contract every AI-triggering call site uses.
//!
//! A [`BudgetGuard`] holds the latest classified snapshot for one project
//! and answers "may I proceed". It never refreshes on its own; callers
//! (or the refresh loop in [`crate::poller`]) trigger reads.
//!
//! Reads are single-flight: concurrent refreshes share one backend read.
//! A manual [`BudgetGuard::refresh`] supersedes an in-flight scheduled
//! [`BudgetGuard::poll`], which is cancelled and reports `None`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use ff_domain::budget::{
    BudgetSnapshot, BudgetSummary, EnforcementDecision, EnforcementMode, OperationRequest,
    ProjectId,
};
use ff_domain::config::FailPolicy;
use ff_domain::error::{Error, Result};
use ff_domain::trace::TraceEvent;

use crate::alerts::AlertEmitter;
use crate::classifier::classify;
use crate::clock::{Clock, SystemClock};
use crate::engine::{decide, decide_without_snapshot, GuardPolicy};
use crate::snapshot::SnapshotReader;

/// Operation kind used for the decision recomputed after every refresh.
pub const STANDING_OPERATION: &str = "standing";

pub const NOT_CHECKED_MESSAGE: &str = "Budget status has not been checked yet.";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Latest classified state for one project.
#[derive(Debug, Clone, Serialize)]
pub struct GuardView {
    pub snapshot: BudgetSnapshot,
    pub summary: BudgetSummary,
    pub refreshed_at: DateTime<Utc>,
}

/// Cloneable record of a failed read, replayed to coalesced callers.
#[derive(Debug, Clone)]
enum ReadFailure {
    NotFound(String),
    Transient(String),
    Other(String),
}

impl ReadFailure {
    fn from_error(e: &Error) -> Self {
        match e {
            Error::NotFound(m) => ReadFailure::NotFound(m.clone()),
            Error::Transient(m) => ReadFailure::Transient(m.clone()),
            other => ReadFailure::Other(other.to_string()),
        }
    }

    fn to_error(&self) -> Error {
        match self {
            ReadFailure::NotFound(m) => Error::NotFound(m.clone()),
            ReadFailure::Transient(m) => Error::Transient(m.clone()),
            ReadFailure::Other(m) => Error::Other(m.clone()),
        }
    }

    fn message(&self) -> &str {
        match self {
            ReadFailure::NotFound(m) | ReadFailure::Transient(m) | ReadFailure::Other(m) => m,
        }
    }
}

type SharedOutcome = std::result::Result<Arc<GuardView>, ReadFailure>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshOrigin {
    Manual,
    Scheduled,
}

struct InFlight {
    id: u64,
    origin: RefreshOrigin,
    rx: watch::Receiver<Option<SharedOutcome>>,
}

enum Role {
    Leader(u64, watch::Sender<Option<SharedOutcome>>),
    Follower(watch::Receiver<Option<SharedOutcome>>),
}

/// Clears the in-flight slot when the leading read finishes or is dropped.
struct SlotRelease<'a> {
    slot: &'a Mutex<Option<InFlight>>,
    id: u64,
}

impl Drop for SlotRelease<'_> {
    fn drop(&mut self) {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|f| f.id == self.id) {
            *slot = None;
        }
    }
}

#[derive(Default)]
struct GuardState {
    view: Option<Arc<GuardView>>,
    last_decision: Option<EnforcementDecision>,
    last_failure: Option<ReadFailure>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// BudgetGuard
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct BudgetGuard {
    project_id: ProjectId,
    reader: Arc<SnapshotReader>,
    policy: Arc<GuardPolicy>,
    emitter: Arc<AlertEmitter>,
    clock: Arc<dyn Clock>,
    state: RwLock<GuardState>,
    inflight: Mutex<Option<InFlight>>,
    flight_seq: AtomicU64,
    scheduled: Mutex<Option<(u64, CancellationToken)>>,
    poll_seq: AtomicU64,
}

impl BudgetGuard {
    pub fn new(
        project_id: ProjectId,
        reader: Arc<SnapshotReader>,
        policy: Arc<GuardPolicy>,
        emitter: Arc<AlertEmitter>,
    ) -> Self {
        Self {
            project_id,
            reader,
            policy,
            emitter,
            clock: Arc::new(SystemClock),
            state: RwLock::new(GuardState::default()),
            inflight: Mutex::new(None),
            flight_seq: AtomicU64::new(0),
            scheduled: Mutex::new(None),
            poll_seq: AtomicU64::new(0),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    // ── refresh ──────────────────────────────────────────────────────

    /// Re-read the snapshot now. Joins a concurrent manual refresh if one
    /// is in flight; cancels an in-flight scheduled poll.
    pub async fn refresh(&self) -> Result<Arc<GuardView>> {
        self.supersede_scheduled_poll();
        self.refresh_single_flight(RefreshOrigin::Manual).await
    }

    /// Scheduled re-read. Returns `None` when a manual refresh superseded it.
    pub async fn poll(&self) -> Option<Result<Arc<GuardView>>> {
        let seq = self.poll_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        *self.scheduled.lock() = Some((seq, token.clone()));

        let outcome =
            unless_cancelled(&token, self.refresh_single_flight(RefreshOrigin::Scheduled)).await;

        let mut scheduled = self.scheduled.lock();
        if scheduled.as_ref().is_some_and(|(s, _)| *s == seq) {
            *scheduled = None;
        }
        outcome
    }

    fn supersede_scheduled_poll(&self) {
        let Some((_, token)) = self.scheduled.lock().take() else {
            return;
        };
        token.cancel();

        let mut slot = self.inflight.lock();
        if slot
            .as_ref()
            .is_some_and(|f| f.origin == RefreshOrigin::Scheduled)
        {
            *slot = None;
        }
        drop(slot);

        TraceEvent::RefreshSuperseded {
            project_id: self.project_id.to_string(),
        }
        .emit();
    }

    async fn refresh_single_flight(&self, origin: RefreshOrigin) -> Result<Arc<GuardView>> {
        loop {
            let role = {
                let mut slot = self.inflight.lock();
                match slot.as_ref() {
                    Some(flight) => Role::Follower(flight.rx.clone()),
                    None => {
                        let id = self.flight_seq.fetch_add(1, Ordering::SeqCst) + 1;
                        let (tx, rx) = watch::channel(None);
                        *slot = Some(InFlight { id, origin, rx });
                        Role::Leader(id, tx)
                    }
                }
            };

            match role {
                Role::Follower(mut rx) => {
                    let shared = match rx.wait_for(Option::is_some).await {
                        Ok(value) => (*value).clone(),
                        // Leader was cancelled; take over.
                        Err(_) => continue,
                    };
                    match shared {
                        Some(Ok(view)) => return Ok(view),
                        Some(Err(failure)) => return Err(failure.to_error()),
                        None => continue,
                    }
                }
                Role::Leader(id, tx) => {
                    let release = SlotRelease {
                        slot: &self.inflight,
                        id,
                    };
                    let result = self.read_and_install().await;
                    drop(release);

                    let shared: SharedOutcome = match &result {
                        Ok(view) => Ok(Arc::clone(view)),
                        Err(e) => Err(ReadFailure::from_error(e)),
                    };
                    tx.send_replace(Some(shared));
                    return result;
                }
            }
        }
    }

    async fn read_and_install(&self) -> Result<Arc<GuardView>> {
        match self.reader.read_snapshot(&self.project_id).await {
            Ok(snapshot) => Ok(self.install(snapshot)),
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    fn install(&self, snapshot: BudgetSnapshot) -> Arc<GuardView> {
        let summary = classify(&snapshot, self.clock.today(), self.policy.warning_threshold);

        TraceEvent::BudgetClassified {
            project_id: self.project_id.to_string(),
            status: summary.status.to_string(),
            budget_used_percent: summary.budget_used_percent,
            projected_month_end: summary.projected_month_end,
        }
        .emit();

        let standing = decide(
            &summary,
            &snapshot.settings,
            &OperationRequest::new(STANDING_OPERATION),
            &self.policy.catalog,
        );
        let view = Arc::new(GuardView {
            snapshot,
            summary,
            refreshed_at: Utc::now(),
        });

        let previous = {
            let mut state = self.state.write();
            let previous = state.view.as_ref().map(|v| v.summary.status);
            state.view = Some(Arc::clone(&view));
            state.last_decision = Some(standing);
            state.last_failure = None;
            previous
        };

        self.emitter
            .on_status_transition(&self.project_id, previous, view.summary.status);
        view
    }

    fn record_failure(&self, e: &Error) {
        let failure = ReadFailure::from_error(e);
        let mut state = self.state.write();
        if matches!(failure, ReadFailure::NotFound(_)) {
            state.view = None;
            state.last_decision = None;
        }
        tracing::warn!(
            project_id = %self.project_id,
            error = %e,
            has_stale_view = state.view.is_some(),
            "budget snapshot read failed"
        );
        state.last_failure = Some(failure);
    }

    // ── decisions ────────────────────────────────────────────────────

    /// Decide on `request` against the current view, without any I/O.
    ///
    /// With no view at all the configured fail policy answers.
    pub fn evaluate(&self, request: &OperationRequest) -> EnforcementDecision {
        let decision = {
            let state = self.state.read();
            match &state.view {
                Some(view) => decide(
                    &view.summary,
                    &view.snapshot.settings,
                    request,
                    &self.policy.catalog,
                ),
                None => decide_without_snapshot(self.policy.fail_policy),
            }
        };

        TraceEvent::GuardDecision {
            project_id: self.project_id.to_string(),
            operation: request.kind.clone(),
            action: decision.action.as_str().to_owned(),
            reason: decision.reason.clone(),
        }
        .emit();

        self.state.write().last_decision = Some(decision.clone());
        decision
    }

    /// Refresh, then decide. A `block` decision becomes `Error::Blocked`
    /// so call sites can short-circuit with `?`.
    ///
    /// A transient refresh failure falls back to the last known view (or
    /// the fail policy); `NotFound` is returned as-is.
    pub async fn check(&self, request: &OperationRequest) -> Result<EnforcementDecision> {
        match self.refresh().await {
            Ok(_) => {}
            Err(e) if e.is_transient() => {
                tracing::warn!(
                    project_id = %self.project_id,
                    error = %e,
                    "budget refresh failed, deciding on last known state"
                );
            }
            Err(e) => return Err(e),
        }

        let decision = self.evaluate(request);
        if decision.is_blocked() {
            return Err(Error::Blocked(decision.reason));
        }
        Ok(decision)
    }

    // ── read accessors ───────────────────────────────────────────────

    /// `true` iff the most recent decision is `block`. Before any decision
    /// exists this follows the fail policy (`false` when failing open).
    pub fn is_operation_blocked(&self) -> bool {
        match &self.state.read().last_decision {
            Some(decision) => decision.is_blocked(),
            None => self.policy.fail_policy == FailPolicy::Closed,
        }
    }

    pub fn blocked_message(&self) -> String {
        self.state
            .read()
            .last_decision
            .as_ref()
            .map(|d| d.reason.clone())
            .unwrap_or_else(|| NOT_CHECKED_MESSAGE.to_owned())
    }

    /// Mode from the latest snapshot; `warn` when nothing has been read.
    pub fn enforcement_mode(&self) -> EnforcementMode {
        self.state
            .read()
            .view
            .as_ref()
            .map(|v| v.snapshot.settings.enforcement_mode)
            .unwrap_or_default()
    }

    pub fn is_over_budget(&self) -> bool {
        self.state
            .read()
            .view
            .as_ref()
            .is_some_and(|v| v.summary.is_over_budget())
    }

    pub fn is_at_risk(&self) -> bool {
        self.state
            .read()
            .view
            .as_ref()
            .is_some_and(|v| v.summary.is_at_risk())
    }

    pub fn view(&self) -> Option<Arc<GuardView>> {
        self.state.read().view.clone()
    }

    pub fn summary(&self) -> Option<BudgetSummary> {
        self.state.read().view.as_ref().map(|v| v.summary.clone())
    }

    pub fn last_decision(&self) -> Option<EnforcementDecision> {
        self.state.read().last_decision.clone()
    }

    /// Message of the most recent failed read, cleared by the next success.
    pub fn last_error(&self) -> Option<String> {
        self.state
            .read()
            .last_failure
            .as_ref()
            .map(|f| f.message().to_owned())
    }
}

/// Run `fut` unless `token` fires first. Cancellation is checked before the
/// future on every wake, so a superseded read never completes (and installs
/// its view) once the token has fired.
async fn unless_cancelled<F: std::future::Future>(
    token: &CancellationToken,
    fut: F,
) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        output = fut => Some(output),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

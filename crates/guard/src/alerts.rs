//! Alert emission with per-session de-duplication.
//!
//! [`AlertLedger`] is the seen-set keyed on `(project, status)`. It is an
//! explicit object so its lifetime follows whatever session owns it and
//! tests can reset it. [`AlertLog`] keeps the most recent events for the
//! API.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use ff_domain::alert::{AlertEvent, AlertKind, AlertSeverity, DowngradeDetails};
use ff_domain::budget::{BudgetStatus, ProjectId};
use ff_domain::trace::TraceEvent;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AlertLedger
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
pub struct AlertLedger {
    seen: Mutex<HashSet<(ProjectId, BudgetStatus)>>,
}

impl AlertLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `(project, status)` as alerted. Returns `true` the first time.
    pub fn mark(&self, project: &ProjectId, status: BudgetStatus) -> bool {
        self.seen.lock().insert((project.clone(), status))
    }

    pub fn contains(&self, project: &ProjectId, status: BudgetStatus) -> bool {
        self.seen.lock().contains(&(project.clone(), status))
    }

    /// Forget everything (new session).
    pub fn reset(&self) {
        self.seen.lock().clear();
    }

    /// Forget one project, e.g. after its budget was raised.
    pub fn reset_project(&self, project: &ProjectId) {
        self.seen.lock().retain(|(p, _)| p != project);
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AlertLog
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Thread-safe ring buffer of recent alerts; evicts the oldest at capacity.
pub struct AlertLog {
    inner: Mutex<VecDeque<AlertEvent>>,
    capacity: usize,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn record(&self, event: AlertEvent) {
        let mut buf = self.inner.lock();
        if buf.len() >= self.capacity {
            buf.pop_front();
        }
        buf.push_back(event);
    }

    /// The `limit` most recent alerts, newest first.
    pub fn recent(&self, limit: usize) -> Vec<AlertEvent> {
        let buf = self.inner.lock();
        buf.iter().rev().take(limit).cloned().collect()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AlertEmitter
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct AlertEmitter {
    ledger: Arc<AlertLedger>,
    log: Arc<AlertLog>,
}

impl AlertEmitter {
    pub fn new(ledger: Arc<AlertLedger>, log: Arc<AlertLog>) -> Self {
        Self { ledger, log }
    }

    pub fn ledger(&self) -> &Arc<AlertLedger> {
        &self.ledger
    }

    pub fn log(&self) -> &Arc<AlertLog> {
        &self.log
    }

    /// Alert for a status change, at most once per `(project, status)`.
    ///
    /// `previous` is `None` for the first observation of a project.
    pub fn on_status_transition(
        &self,
        project: &ProjectId,
        previous: Option<BudgetStatus>,
        current: BudgetStatus,
    ) -> Option<AlertEvent> {
        if previous == Some(current) {
            return None;
        }
        let severity = AlertSeverity::for_status(current)?;
        if !self.ledger.mark(project, current) {
            return None;
        }

        let message = match current {
            BudgetStatus::OverBudget => {
                "Monthly AI budget exceeded. Review enforcement settings or raise the budget."
            }
            _ => "Projected spend will exceed the monthly AI budget before month end.",
        };
        let event = AlertEvent::new(
            project.clone(),
            AlertKind::StatusTransition,
            severity,
            message,
        )
        .with_status(current);
        self.publish(&event);
        Some(event)
    }

    /// The caller actually applied a downgrade.
    pub fn trigger_downgrade_notification(
        &self,
        project: &ProjectId,
        details: &DowngradeDetails,
    ) -> AlertEvent {
        let from = details.from_model.as_deref().unwrap_or("the requested configuration");
        let mut message = format!("Switched from {from} to {} to stay within budget", details.to_model);
        if let Some(op) = &details.operation {
            message.push_str(&format!(" ({op})"));
        }
        if let Some(savings) = details.estimated_savings_usd {
            message.push_str(&format!("; estimated savings ${savings:.2}"));
        }
        message.push('.');

        let event = AlertEvent::new(
            project.clone(),
            AlertKind::DowngradeApplied,
            AlertSeverity::Info,
            message,
        );
        self.publish(&event);
        event
    }

    /// A `block` decision actually prevented an operation.
    pub fn trigger_abort_notification(&self, project: &ProjectId, reason: &str) -> AlertEvent {
        let event = AlertEvent::new(
            project.clone(),
            AlertKind::OperationAborted,
            AlertSeverity::Critical,
            format!("Operation aborted: {reason}"),
        );
        self.publish(&event);
        event
    }

    fn publish(&self, event: &AlertEvent) {
        TraceEvent::AlertEmitted {
            project_id: event.project_id.to_string(),
            kind: format!("{:?}", event.kind),
            severity: format!("{:?}", event.severity),
        }
        .emit();
        self.log.record(event.clone());
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

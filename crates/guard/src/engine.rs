//! Enforcement decision engine.
//!
//! | status                  | warn                  | auto_downgrade         | abort               |
//! |-------------------------|-----------------------|------------------------|---------------------|
//! | under_budget / on_track | proceed               | proceed                | proceed             |
//! | at_risk                 | proceed + warning     | proceed_with_downgrade | proceed + warning   |
//! | over_budget             | proceed + strong warn | proceed_with_downgrade | block               |
//!
//! An estimate above `max_cost_per_query_usd` overrides the table: `block`
//! in `auto_downgrade` and `abort`; in `warn` a downgrade when the catalog
//! has a path for the model, otherwise `block`.

use ff_domain::budget::{
    BudgetSettings, BudgetStatus, BudgetSummary, DecisionWarning, EnforcementDecision,
    EnforcementMode, OperationRequest,
};
use ff_domain::config::{FailPolicy, GuardConfig};

use crate::downgrade::DowngradeCatalog;

/// Everything the engine needs besides the per-call inputs.
#[derive(Debug, Clone)]
pub struct GuardPolicy {
    pub warning_threshold: f64,
    pub fail_policy: FailPolicy,
    pub catalog: DowngradeCatalog,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self::from_config(&GuardConfig::default())
    }
}

impl GuardPolicy {
    pub fn from_config(cfg: &GuardConfig) -> Self {
        Self {
            warning_threshold: cfg.warning_threshold,
            fail_policy: cfg.fail_policy,
            catalog: DowngradeCatalog::from_config(&cfg.downgrades),
        }
    }
}

/// Decide whether `request` may run given the project's current summary.
///
/// Pure: safe to call speculatively before committing to an operation.
pub fn decide(
    summary: &BudgetSummary,
    settings: &BudgetSettings,
    request: &OperationRequest,
    catalog: &DowngradeCatalog,
) -> EnforcementDecision {
    let mode = settings.enforcement_mode;

    if let (Some(cap), Some(estimate)) = (settings.max_cost_per_query_usd, request.estimated_cost_usd) {
        if estimate > cap {
            return decide_over_cap(mode, cap, estimate, request, catalog);
        }
    }

    let status = summary.status;
    match status {
        BudgetStatus::UnderBudget | BudgetStatus::OnTrack => {
            EnforcementDecision::proceed(format!("Budget is {status} (mode: {mode})."))
        }
        BudgetStatus::AtRisk => match mode {
            EnforcementMode::Warn | EnforcementMode::Abort => EnforcementDecision::proceed_with_warning(
                format!(
                    "Budget is at_risk (mode: {mode}): projected month-end spend exceeds the monthly budget."
                ),
                DecisionWarning::Warning,
            ),
            EnforcementMode::AutoDowngrade => EnforcementDecision::downgrade(
                "Budget is at_risk (mode: auto_downgrade): switching to a cheaper configuration.",
                catalog.resolve_or_generic(request.model.as_deref()),
            ),
        },
        BudgetStatus::OverBudget => match mode {
            EnforcementMode::Warn => EnforcementDecision::proceed_with_warning(
                "Budget is over_budget (mode: warn): monthly budget exceeded, operation allowed.",
                DecisionWarning::Strong,
            ),
            EnforcementMode::AutoDowngrade => EnforcementDecision::downgrade(
                "Budget is over_budget (mode: auto_downgrade): switching to a cheaper configuration.",
                catalog.resolve_or_generic(request.model.as_deref()),
            ),
            EnforcementMode::Abort => EnforcementDecision::block(
                "Budget is over_budget (mode: abort): AI operations are blocked until the budget is raised or the month resets.",
            ),
        },
    }
}

fn decide_over_cap(
    mode: EnforcementMode,
    cap: f64,
    estimate: f64,
    request: &OperationRequest,
    catalog: &DowngradeCatalog,
) -> EnforcementDecision {
    let cap_reason = format!(
        "Estimated cost ${estimate:.2} exceeds the per-query cap of ${cap:.2} (mode: {mode})"
    );
    match mode {
        EnforcementMode::Warn => match catalog.resolve(request.model.as_deref()) {
            Some(suggestion) => EnforcementDecision::downgrade(
                format!("{cap_reason}: switching to {}.", suggestion.to_model),
                suggestion,
            ),
            None => EnforcementDecision::block(format!(
                "{cap_reason} and no cheaper configuration is available."
            )),
        },
        EnforcementMode::AutoDowngrade | EnforcementMode::Abort => {
            EnforcementDecision::block(format!("{cap_reason}."))
        }
    }
}

/// Decision when no snapshot could be read at all.
pub fn decide_without_snapshot(policy: FailPolicy) -> EnforcementDecision {
    match policy {
        FailPolicy::Open => EnforcementDecision::proceed_with_warning(
            "Budget status is unavailable; operation allowed (fail-open).",
            DecisionWarning::Warning,
        ),
        FailPolicy::Closed => EnforcementDecision::block(
            "Budget status is unavailable; operation blocked (fail-closed).",
        ),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

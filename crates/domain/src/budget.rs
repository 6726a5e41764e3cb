//! Budget data model: per-project settings, the derived monthly summary,
//! and the per-call enforcement decision.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Identifiers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Opaque project identifier as issued by the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ProjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Settings
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How the engine reacts once a project is at risk or over budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementMode {
    #[default]
    Warn,
    AutoDowngrade,
    Abort,
}

impl EnforcementMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnforcementMode::Warn => "warn",
            EnforcementMode::AutoDowngrade => "auto_downgrade",
            EnforcementMode::Abort => "abort",
        }
    }
}

impl fmt::Display for EnforcementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnforcementMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "warn" => Ok(EnforcementMode::Warn),
            "auto_downgrade" => Ok(EnforcementMode::AutoDowngrade),
            "abort" => Ok(EnforcementMode::Abort),
            other => Err(Error::Validation(format!(
                "unknown enforcement mode \"{other}\" (expected warn, auto_downgrade or abort)"
            ))),
        }
    }
}

/// Per-project budget configuration, owned by the project admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSettings {
    pub project_id: ProjectId,
    /// Ceiling for the current calendar month's AI spend. `0` = unlimited.
    pub monthly_budget_usd: f64,
    /// Hard per-operation ceiling, independent of the monthly budget.
    #[serde(default)]
    pub max_cost_per_query_usd: Option<f64>,
    #[serde(default)]
    pub enforcement_mode: EnforcementMode,
}

impl BudgetSettings {
    /// Settings used when the project has never saved any.
    pub fn defaults_for(project_id: ProjectId, monthly_budget_usd: f64) -> Self {
        Self {
            project_id,
            monthly_budget_usd,
            max_cost_per_query_usd: None,
            enforcement_mode: EnforcementMode::Warn,
        }
    }
}

/// Partial update accepted by the settings write endpoint.
///
/// `max_cost_per_query_usd` distinguishes "absent" (leave unchanged) from
/// an explicit `null` (clear the cap).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetSettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_budget_usd: Option<f64>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_cost_per_query_usd: Option<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforcement_mode: Option<EnforcementMode>,
}

fn explicit_null<'de, D>(deserializer: D) -> std::result::Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(Some)
}

impl BudgetSettingsPatch {
    /// Reject payloads that must never reach persistence.
    pub fn validate(&self) -> Result<()> {
        if let Some(budget) = self.monthly_budget_usd {
            if !budget.is_finite() || budget < 0.0 {
                return Err(Error::Validation(format!(
                    "monthly_budget_usd must be a non-negative amount, got {budget}"
                )));
            }
        }
        if let Some(Some(cap)) = self.max_cost_per_query_usd {
            if !cap.is_finite() || cap <= 0.0 {
                return Err(Error::Validation(format!(
                    "max_cost_per_query_usd must be greater than 0, got {cap}"
                )));
            }
        }
        if self.is_empty() {
            return Err(Error::Validation("settings patch is empty".into()));
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.monthly_budget_usd.is_none()
            && self.max_cost_per_query_usd.is_none()
            && self.enforcement_mode.is_none()
    }

    /// Apply the patch on top of existing settings.
    pub fn apply(&self, current: &BudgetSettings) -> BudgetSettings {
        let mut next = current.clone();
        if let Some(budget) = self.monthly_budget_usd {
            next.monthly_budget_usd = budget;
        }
        if let Some(cap) = self.max_cost_per_query_usd {
            next.max_cost_per_query_usd = cap;
        }
        if let Some(mode) = self.enforcement_mode {
            next.enforcement_mode = mode;
        }
        next
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Snapshot + summary
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Raw inputs read from the backend for one project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetSnapshot {
    pub project_id: ProjectId,
    /// Spend attributed to the project in the current calendar month.
    pub spending_usd: f64,
    pub settings: BudgetSettings,
    /// `true` when the project had no saved settings and defaults were used.
    pub settings_defaulted: bool,
    pub read_at: DateTime<Utc>,
}

/// Discrete risk state. Declaration order is the ordinal risk rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    UnderBudget,
    OnTrack,
    AtRisk,
    OverBudget,
}

impl BudgetStatus {
    pub fn rank(&self) -> u8 {
        match self {
            BudgetStatus::UnderBudget => 0,
            BudgetStatus::OnTrack => 1,
            BudgetStatus::AtRisk => 2,
            BudgetStatus::OverBudget => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetStatus::UnderBudget => "under_budget",
            BudgetStatus::OnTrack => "on_track",
            BudgetStatus::AtRisk => "at_risk",
            BudgetStatus::OverBudget => "over_budget",
        }
    }
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Month-to-date view of a project's spend, recomputed on every read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetSummary {
    pub project_id: ProjectId,
    pub current_spending_usd: f64,
    pub monthly_budget_usd: f64,
    /// May be negative once over budget.
    pub remaining_budget_usd: f64,
    /// Unbounded above 100; `0` for an unlimited budget.
    pub budget_used_percent: f64,
    pub days_elapsed: u32,
    pub days_in_month: u32,
    /// Inclusive of today.
    pub days_remaining: u32,
    /// `None` for an unlimited budget.
    pub projected_month_end: Option<f64>,
    pub days_until_exhausted: Option<u32>,
    pub status: BudgetStatus,
}

impl BudgetSummary {
    pub fn is_over_budget(&self) -> bool {
        self.status == BudgetStatus::OverBudget
    }

    pub fn is_at_risk(&self) -> bool {
        self.status == BudgetStatus::AtRisk
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Operations + decisions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A prospective paid AI operation, described before it runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationRequest {
    /// Free-form operation kind (`evaluation`, `search`, `training`, ...).
    #[serde(default = "d_kind")]
    pub kind: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub estimated_cost_usd: Option<f64>,
}

fn d_kind() -> String {
    "ai_operation".into()
}

impl OperationRequest {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            model: None,
            estimated_cost_usd: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_estimate(mut self, cost_usd: f64) -> Self {
        self.estimated_cost_usd = Some(cost_usd);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementAction {
    Proceed,
    ProceedWithDowngrade,
    Block,
}

impl EnforcementAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnforcementAction::Proceed => "proceed",
            EnforcementAction::ProceedWithDowngrade => "proceed_with_downgrade",
            EnforcementAction::Block => "block",
        }
    }
}

/// Warning attached to a `proceed` decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionWarning {
    Warning,
    Strong,
}

/// A reduced-cost configuration offered in place of the requested one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DowngradeSuggestion {
    pub from_model: Option<String>,
    pub to_model: String,
    pub note: String,
}

/// Outcome of one guarded call. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnforcementDecision {
    pub allowed: bool,
    pub action: EnforcementAction,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<DecisionWarning>,
    /// Present iff `action == ProceedWithDowngrade`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_downgrade: Option<DowngradeSuggestion>,
}

impl EnforcementDecision {
    pub fn proceed(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            action: EnforcementAction::Proceed,
            reason: reason.into(),
            warning: None,
            suggested_downgrade: None,
        }
    }

    pub fn proceed_with_warning(reason: impl Into<String>, warning: DecisionWarning) -> Self {
        Self {
            warning: Some(warning),
            ..Self::proceed(reason)
        }
    }

    pub fn downgrade(reason: impl Into<String>, suggestion: DowngradeSuggestion) -> Self {
        Self {
            allowed: true,
            action: EnforcementAction::ProceedWithDowngrade,
            reason: reason.into(),
            warning: None,
            suggested_downgrade: Some(suggestion),
        }
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            action: EnforcementAction::Block,
            reason: reason.into(),
            warning: None,
            suggested_downgrade: None,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.action == EnforcementAction::Block
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

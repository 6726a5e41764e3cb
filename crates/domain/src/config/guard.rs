use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Budget guard policy
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Tunables for classification and enforcement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Percent of the monthly budget at which a project counts as `on_track`
    /// (elevated) instead of `under_budget`.
    #[serde(default = "d_warning_threshold")]
    pub warning_threshold: f64,
    /// Budget assumed for projects that never saved settings.
    #[serde(default = "d_default_budget")]
    pub default_monthly_budget_usd: f64,
    /// What the guard answers when no snapshot could be read.
    #[serde(default)]
    pub fail_policy: FailPolicy,
    /// Cadence of the background refresh loop. `0` disables polling.
    #[serde(default = "d_refresh_secs")]
    pub refresh_interval_secs: u64,
    /// Capacity of the recent-alerts ring buffer.
    #[serde(default = "d_alert_log_capacity")]
    pub alert_log_capacity: usize,
    #[serde(default)]
    pub downgrades: DowngradeConfig,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            warning_threshold: d_warning_threshold(),
            default_monthly_budget_usd: d_default_budget(),
            fail_policy: FailPolicy::Open,
            refresh_interval_secs: d_refresh_secs(),
            alert_log_capacity: d_alert_log_capacity(),
            downgrades: DowngradeConfig::default(),
        }
    }
}

/// Behavior when the budget snapshot is unavailable (backend down).
///
/// `Open` lets operations through so that the guard never causes an
/// outage of its own; `Closed` blocks them for stricter deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailPolicy {
    #[default]
    Open,
    Closed,
}

/// Model substitutions offered when an operation has to get cheaper.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DowngradeConfig {
    /// Fallback target for models without an explicit entry.
    #[serde(default)]
    pub default_target: Option<String>,
    /// Expensive model → cheaper model.
    #[serde(default)]
    pub models: HashMap<String, String>,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_warning_threshold() -> f64 {
    75.0
}
fn d_default_budget() -> f64 {
    50.0
}
fn d_refresh_secs() -> u64 {
    45
}
fn d_alert_log_capacity() -> usize {
    200
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

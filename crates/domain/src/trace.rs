use serde::Serialize;

/// Structured trace events emitted across all FineFlow guard crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    BackendCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
    SnapshotRead {
        project_id: String,
        spending_usd: f64,
        settings_defaulted: bool,
    },
    BudgetClassified {
        project_id: String,
        status: String,
        budget_used_percent: f64,
        projected_month_end: Option<f64>,
    },
    GuardDecision {
        project_id: String,
        operation: String,
        action: String,
        reason: String,
    },
    AlertEmitted {
        project_id: String,
        kind: String,
        severity: String,
    },
    RefreshSuperseded {
        project_id: String,
    },
    SettingsUpdated {
        project_id: String,
        monthly_budget_usd: f64,
        enforcement_mode: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "ff_event");
    }
}

//! User-facing alert events produced by the guard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::budget::{BudgetStatus, ProjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    /// Severity for a status the project has just entered, if it warrants one.
    pub fn for_status(status: BudgetStatus) -> Option<Self> {
        match status {
            BudgetStatus::AtRisk => Some(AlertSeverity::Warning),
            BudgetStatus::OverBudget => Some(AlertSeverity::Critical),
            BudgetStatus::UnderBudget | BudgetStatus::OnTrack => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    StatusTransition,
    DowngradeApplied,
    OperationAborted,
}

/// Details reported by the caller after it actually applied a downgrade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DowngradeDetails {
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub from_model: Option<String>,
    pub to_model: String,
    #[serde(default)]
    pub estimated_savings_usd: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub id: Uuid,
    pub project_id: ProjectId,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BudgetStatus>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl AlertEvent {
    pub fn new(
        project_id: ProjectId,
        kind: AlertKind,
        severity: AlertSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            kind,
            severity,
            status: None,
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: BudgetStatus) -> Self {
        self.status = Some(status);
        self
    }
}

//! Data Transfer Objects matching the hosted backend's budget endpoints.
//!
//! Field names use `camelCase` on the wire (matching the web client) and
//! `snake_case` in Rust code via `#[serde(rename_all = "camelCase")]`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use ff_domain::budget::{BudgetSettings, BudgetSettingsPatch, EnforcementMode, ProjectId};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Spend summary
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// GET /functions/v1/budget/{projectId}/summary response body.
///
/// The backend computes more fields than this; only the month-to-date
/// spend is authoritative here, everything else is recomputed locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendSummaryDto {
    pub current_spending_usd: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_budget_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_start: Option<NaiveDate>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Settings
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// GET/PUT /functions/v1/budget/{projectId}/settings record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSettingsDto {
    pub project_id: String,
    pub monthly_budget_usd: f64,
    #[serde(default)]
    pub max_cost_per_query_usd: Option<f64>,
    #[serde(default)]
    pub enforcement_mode: EnforcementMode,
}

impl From<BudgetSettingsDto> for BudgetSettings {
    fn from(dto: BudgetSettingsDto) -> Self {
        Self {
            project_id: ProjectId::new(dto.project_id),
            monthly_budget_usd: dto.monthly_budget_usd,
            max_cost_per_query_usd: dto.max_cost_per_query_usd,
            enforcement_mode: dto.enforcement_mode,
        }
    }
}

impl From<&BudgetSettings> for BudgetSettingsDto {
    fn from(settings: &BudgetSettings) -> Self {
        Self {
            project_id: settings.project_id.to_string(),
            monthly_budget_usd: settings.monthly_budget_usd,
            max_cost_per_query_usd: settings.max_cost_per_query_usd,
            enforcement_mode: settings.enforcement_mode,
        }
    }
}

/// PUT /functions/v1/budget/{projectId}/settings request body.
///
/// An explicit `maxCostPerQueryUsd: null` clears the cap; an absent field
/// leaves it untouched.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatchDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_budget_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cost_per_query_usd: Option<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforcement_mode: Option<EnforcementMode>,
}

impl From<&BudgetSettingsPatch> for SettingsPatchDto {
    fn from(patch: &BudgetSettingsPatch) -> Self {
        Self {
            monthly_budget_usd: patch.monthly_budget_usd,
            max_cost_per_query_usd: patch.max_cost_per_query_usd,
            enforcement_mode: patch.enforcement_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_dto_reads_camel_case() {
        let json = r#"{
            "projectId": "p-42",
            "monthlyBudgetUsd": 500,
            "maxCostPerQueryUsd": 2.5,
            "enforcementMode": "auto_downgrade"
        }"#;
        let dto: BudgetSettingsDto = serde_json::from_str(json).unwrap();
        let settings = BudgetSettings::from(dto);
        assert_eq!(settings.project_id.as_str(), "p-42");
        assert_eq!(settings.max_cost_per_query_usd, Some(2.5));
        assert_eq!(settings.enforcement_mode, EnforcementMode::AutoDowngrade);
    }

    #[test]
    fn missing_mode_defaults_to_warn() {
        let json = r#"{"projectId": "p", "monthlyBudgetUsd": 10}"#;
        let dto: BudgetSettingsDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.enforcement_mode, EnforcementMode::Warn);
    }

    #[test]
    fn patch_dto_writes_explicit_null_cap() {
        let patch = BudgetSettingsPatch {
            max_cost_per_query_usd: Some(None),
            ..Default::default()
        };
        let json = serde_json::to_value(SettingsPatchDto::from(&patch)).unwrap();
        assert!(json.get("maxCostPerQueryUsd").unwrap().is_null());
        assert!(json.get("monthlyBudgetUsd").is_none());
    }
}

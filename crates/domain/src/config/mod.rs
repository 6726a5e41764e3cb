mod backend;
mod guard;
mod observability;
mod server;

pub use backend::*;
pub use guard::*;
pub use observability::*;
pub use server::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub guard: GuardConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }

        if self.backend.transport == BackendTransport::Rest && self.backend.base_url.is_empty() {
            errors.push(ConfigError::error(
                "backend.base_url",
                "base_url must not be empty for the rest transport",
            ));
        }
        if self.backend.transport == BackendTransport::Memory {
            errors.push(ConfigError::warning(
                "backend.transport",
                "memory transport keeps budgets in-process; spend is lost on restart",
            ));
        }

        let threshold = self.guard.warning_threshold;
        if !threshold.is_finite() || threshold <= 0.0 || threshold > 100.0 {
            errors.push(ConfigError::error(
                "guard.warning_threshold",
                format!("must be within (0, 100], got {threshold}"),
            ));
        }

        let budget = self.guard.default_monthly_budget_usd;
        if !budget.is_finite() || budget < 0.0 {
            errors.push(ConfigError::error(
                "guard.default_monthly_budget_usd",
                format!("must be a non-negative amount, got {budget}"),
            ));
        }

        if self.guard.fail_policy == FailPolicy::Open {
            errors.push(ConfigError::warning(
                "guard.fail_policy",
                "fail-open: operations proceed while the budget backend is unreachable",
            ));
        }

        if self.guard.alert_log_capacity == 0 {
            errors.push(ConfigError::error(
                "guard.alert_log_capacity",
                "must be greater than 0",
            ));
        }

        for (from, to) in &self.guard.downgrades.models {
            if from == to {
                errors.push(ConfigError::warning(
                    &format!("guard.downgrades.models.{from}"),
                    "model downgrades to itself and will be ignored",
                ));
            }
        }

        if self.server.cors.allowed_origins.len() == 1
            && self.server.cors.allowed_origins[0] == "*"
        {
            errors.push(ConfigError::warning(
                "server.cors.allowed_origins",
                "wildcard \"*\" allows all origins (not recommended for production)",
            ));
        }

        errors
    }
}

//! AppState construction shared by `serve` and the API tests.

use std::sync::Arc;

use anyhow::Context;
use sha2::{Digest, Sha256};

use ff_backend::{create_backend, BudgetBackend};
use ff_domain::config::{Config, ConfigSeverity};
use ff_guard::GuardRegistry;

use crate::state::AppState;

/// Validate config, connect the backend and return a fully-wired
/// [`AppState`]. Refresh loops start lazily as projects are first used.
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let error_count = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if error_count > 0 {
        anyhow::bail!("config validation failed with {error_count} error(s)");
    }

    // ── Budget backend ───────────────────────────────────────────────
    let backend = create_backend(&config.backend).context("creating budget backend")?;
    match backend.health().await {
        Ok(_) => tracing::info!(transport = ?config.backend.transport, "budget backend reachable"),
        // Not fatal: the guard's fail policy covers an unreachable backend.
        Err(e) => tracing::warn!(error = %e, "budget backend health check failed"),
    }

    // ── Tokens (read once, hashed for constant-time comparison) ──────
    let api_token_hash = token_hash_from_env(&config.server.api_token_env, "API");
    let admin_token_hash = token_hash_from_env(&config.server.admin_token_env, "admin");

    Ok(state_with_backend(config, backend, api_token_hash, admin_token_hash))
}

/// Assemble an [`AppState`] around an existing backend.
pub fn state_with_backend(
    config: Arc<Config>,
    backend: Arc<dyn BudgetBackend>,
    api_token_hash: Option<Vec<u8>>,
    admin_token_hash: Option<Vec<u8>>,
) -> AppState {
    let guards = Arc::new(GuardRegistry::new(Arc::clone(&backend), &config.guard));
    tracing::info!(
        fail_policy = ?config.guard.fail_policy,
        refresh_interval_secs = config.guard.refresh_interval_secs,
        "budget guard registry ready"
    );

    AppState {
        config,
        backend,
        guards,
        api_token_hash,
        admin_token_hash,
    }
}

pub fn hash_token(token: &str) -> Vec<u8> {
    Sha256::digest(token.as_bytes()).to_vec()
}

fn token_hash_from_env(env_var: &str, label: &str) -> Option<Vec<u8>> {
    match std::env::var(env_var).ok().filter(|t| !t.is_empty()) {
        Some(token) => {
            tracing::info!(source = %format!("env:{env_var}"), "{label} bearer-token auth enabled");
            Some(hash_token(&token))
        }
        None => {
            tracing::warn!("{label} bearer-token auth DISABLED; set the {env_var} env var");
            None
        }
    }
}

use std::sync::Arc;

use ff_backend::BudgetBackend;
use ff_domain::config::Config;
use ff_guard::GuardRegistry;

/// Shared application state passed to all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub backend: Arc<dyn BudgetBackend>,
    /// One guard per project plus the shared alert emitter.
    pub guards: Arc<GuardRegistry>,

    // ── Security ──────────────────────────────────────────────────────
    /// SHA-256 of the API bearer token; `None` disables API auth (dev mode).
    pub api_token_hash: Option<Vec<u8>>,
    /// SHA-256 of the admin bearer token; `None` disables admin auth.
    pub admin_token_hash: Option<Vec<u8>>,
}

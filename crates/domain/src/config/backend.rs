use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Hosted backend connection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Connection settings for the hosted backend that stores budget
/// settings and the spend ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "d_backend_url")]
    pub base_url: String,
    /// Inline API key. Prefer `api_key_env` outside of local development.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_transport")]
    pub transport: BackendTransport,
    #[serde(default = "d_8000")]
    pub timeout_ms: u64,
    #[serde(default = "d_3")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendTransport {
    /// REST endpoints of the hosted backend.
    Rest,
    /// Process-local store; for demos and tests.
    Memory,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: d_backend_url(),
            api_key: None,
            api_key_env: d_api_key_env(),
            transport: BackendTransport::Rest,
            timeout_ms: 8000,
            max_retries: 3,
        }
    }
}

impl BackendConfig {
    /// Inline key first, then the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| {
            std::env::var(&self.api_key_env)
                .ok()
                .filter(|v| !v.is_empty())
        })
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_backend_url() -> String {
    "http://localhost:54321".into()
}
fn d_api_key_env() -> String {
    "FF_BACKEND_KEY".into()
}
fn d_transport() -> BackendTransport {
    BackendTransport::Rest
}
fn d_8000() -> u64 {
    8000
}
fn d_3() -> u32 {
    3
}

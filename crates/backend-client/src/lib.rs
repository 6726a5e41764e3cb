//! `ff-backend`: client crate for the hosted backend that stores budget
//! settings and the per-project spend ledger.
//!
//! Provides the [`BudgetBackend`] trait, a production REST implementation
//! ([`RestBudgetBackend`]), a process-local implementation
//! ([`InMemoryBudgetBackend`]) and the wire DTOs.
//!
//! # Transport selection
//!
//! Use [`create_backend`] to build the right implementation based on the
//! `backend.transport` config field:
//!
//! | Transport | Implementation          | Best for                    |
//! |-----------|-------------------------|-----------------------------|
//! | `rest`    | `RestBudgetBackend`     | Production (default)        |
//! | `memory`  | `InMemoryBudgetBackend` | Local demos, tests          |
//!
//! # Quick start
//!
//! ```rust,no_run
//! use ff_domain::config::BackendConfig;
//! use ff_backend::{BudgetBackend, RestBudgetBackend};
//!
//! # async fn example() -> ff_domain::error::Result<()> {
//! let cfg = BackendConfig::default();
//! let client = RestBudgetBackend::new(&cfg)?;
//!
//! let summary = client.spend_summary(&"project-123".into()).await?;
//! println!("spent ${:.2} this month", summary.current_spending_usd);
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod provider;
pub mod rest;
pub mod types;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use memory::InMemoryBudgetBackend;
pub use provider::BudgetBackend;
pub use rest::{from_reqwest, RestBudgetBackend};
pub use types::{BudgetSettingsDto, SettingsPatchDto, SpendSummaryDto};

use std::sync::Arc;

use ff_domain::config::{BackendConfig, BackendTransport};
use ff_domain::error::Result;

/// Create the appropriate [`BudgetBackend`] based on the transport config.
pub fn create_backend(cfg: &BackendConfig) -> Result<Arc<dyn BudgetBackend>> {
    match cfg.transport {
        BackendTransport::Rest => {
            let client = RestBudgetBackend::new(cfg)?;
            tracing::info!(base_url = %cfg.base_url, "using REST budget backend");
            Ok(Arc::new(client))
        }
        BackendTransport::Memory => {
            tracing::warn!("using in-memory budget backend; spend is not persisted");
            Ok(Arc::new(InMemoryBudgetBackend::new()))
        }
    }
}

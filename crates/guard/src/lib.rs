//! `ff-guard`: budget enforcement for paid AI operations.
//!
//! The pipeline, leaves first:
//!
//! 1. [`SnapshotReader`] reads month-to-date spend + settings from the
//!    hosted backend (defaults when a project never saved settings).
//! 2. [`classify`] turns a snapshot into a [`BudgetSummary`] with a risk
//!    status and a linear month-end projection.
//! 3. [`decide`] maps `(status, enforcement mode, per-query cap)` to an
//!    [`EnforcementDecision`].
//! 4. [`BudgetGuard`] is the call-site façade: "may I proceed, and if not,
//!    why not".
//! 5. [`AlertEmitter`] turns status transitions into alerts, once per
//!    `(project, status)` per session.
//!
//! [`GuardRegistry`] owns one guard per project plus their refresh loops.
//!
//! [`BudgetSummary`]: ff_domain::budget::BudgetSummary
//! [`EnforcementDecision`]: ff_domain::budget::EnforcementDecision

pub mod alerts;
pub mod classifier;
pub mod clock;
pub mod downgrade;
pub mod engine;
pub mod guard;
pub mod poller;
pub mod registry;
pub mod settings;
pub mod snapshot;

pub use alerts::{AlertEmitter, AlertLedger, AlertLog};
pub use classifier::{classify, days_in_month};
pub use clock::{Clock, FixedClock, SystemClock};
pub use downgrade::DowngradeCatalog;
pub use engine::{decide, decide_without_snapshot, GuardPolicy};
pub use guard::{BudgetGuard, GuardView, NOT_CHECKED_MESSAGE};
pub use poller::{run_refresh_loop, spawn_refresh_loop, RefreshExit};
pub use registry::GuardRegistry;
pub use settings::SettingsService;
pub use snapshot::SnapshotReader;

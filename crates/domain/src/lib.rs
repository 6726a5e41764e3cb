//! `ff-domain`: shared types for the FineFlow budget guard.
//!
//! Holds the budget data model, alert events, the error taxonomy, the
//! TOML configuration tree and the structured trace events emitted by
//! every other crate in the workspace.

pub mod alert;
pub mod budget;
pub mod config;
pub mod error;
pub mod trace;

//! `ff-gateway`: HTTP API and CLI hosting the FineFlow budget guard.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod state;

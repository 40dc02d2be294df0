//! Shared model for agent-switchboard: the canonical agent snapshot types,
//! per-backend status tables and the configuration layer.

pub mod config;
pub mod status;
pub mod types;

//! Logging setup shared by agent-switchboard binaries.
//!
//! Output goes through `tracing-subscriber`, either human-readable or as
//! JSON lines for log shippers. `RUST_LOG` always wins over the configured
//! level.

pub mod logging;

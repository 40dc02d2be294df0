//! Backend adapters and the aggregation engine.
//!
//! Each adapter turns one agent execution backend's HTTP status endpoint
//! into a list of [`sb_core::types::UnifiedAgent`]s and never fails: transport
//! errors, bad status codes and malformed payloads all come back as a single
//! degraded node. [`aggregate::AggregationEngine`] polls every adapter
//! concurrently and concatenates the results.

pub mod actions;
pub mod adapter;
pub mod aggregate;
pub mod dispatch;
pub mod events;
pub mod fleet;
pub mod grouping;
pub mod http;
pub mod kanban;

pub use adapter::{BackendAdapter, BackendTarget, Conductor, Degradation};
pub use aggregate::{aggregate, AdapterBinding, AggregationEngine};
pub use http::{BackendHttp, FetchError};

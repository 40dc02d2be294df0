//! Action runner backend.
//!
//! `GET /api/<namespace>/actions?limit=<N>` returns
//! `{ "data": { "actions": [action, ...] } }`. Actions are grouped by
//! `agent_type`. An unreachable action service is reported as an error,
//! not as idle.

use sb_core::status;
use sb_core::types::{BackendKind, UnifiedAgent};
use serde_json::Value;

use crate::adapter::{BackendAdapter, Conductor, Degradation};
use crate::grouping::{group_records, records_at, GroupSpec};
use crate::http::FetchError;

pub const DEFAULT_NAMESPACE: &str = "agents";
pub const DEFAULT_LIMIT: u32 = 50;

const GROUPING: GroupSpec = GroupSpec {
    backend: BackendKind::Actions,
    key_field: "agent_type",
    default_key: "executor",
    status_fields: &["status"],
    timestamp_fields: &["created_at", "timestamp"],
    model_field: "model",
    mission_field: "run_id",
    role: "action agent",
    table: &status::ACTIONS,
};

const CONDUCTOR: Conductor = Conductor {
    native_id: "conductor",
    name: "Action conductor",
    role: "conductor",
};

#[derive(Debug, Clone)]
pub struct ActionsAdapter {
    namespace: String,
    limit: u32,
}

impl Default for ActionsAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE, DEFAULT_LIMIT)
    }
}

impl ActionsAdapter {
    pub fn new(namespace: impl Into<String>, limit: u32) -> Self {
        Self {
            namespace: namespace.into(),
            limit,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

#[async_trait::async_trait]
impl BackendAdapter for ActionsAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Actions
    }

    fn path(&self) -> String {
        format!(
            "/api/{}/actions?limit={}",
            urlencoding::encode(self.namespace.trim()),
            self.limit
        )
    }

    fn degradation(&self) -> Degradation {
        Degradation::Hard
    }

    fn conductor(&self) -> Conductor {
        CONDUCTOR
    }

    fn normalize(&self, payload: &Value) -> Result<Vec<UnifiedAgent>, FetchError> {
        let records = records_at(payload, &["data", "actions"])?;
        Ok(group_records(&GROUPING, records))
    }
}

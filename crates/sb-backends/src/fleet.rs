//! Long-lived agent fleet backend.
//!
//! `GET /api/fleet/agents` returns `{ "data": [agent, ...] }`, roughly one
//! record per agent, though restarts can leave several records under the
//! same `name`. Status is read from `state`, falling back to `status`.

use sb_core::status;
use sb_core::types::{BackendKind, UnifiedAgent};
use serde_json::Value;

use crate::adapter::{BackendAdapter, Conductor, Degradation};
use crate::grouping::{group_records, records_at, GroupSpec};
use crate::http::FetchError;

pub const AGENTS_PATH: &str = "/api/fleet/agents";

const GROUPING: GroupSpec = GroupSpec {
    backend: BackendKind::Fleet,
    key_field: "name",
    default_key: "worker",
    status_fields: &["state", "status"],
    timestamp_fields: &["last_seen"],
    model_field: "model",
    mission_field: "current_mission",
    role: "fleet agent",
    table: &status::FLEET,
};

const SUPERVISOR: Conductor = Conductor {
    native_id: "supervisor",
    name: "Fleet supervisor",
    role: "supervisor",
};

#[derive(Debug, Clone, Copy, Default)]
pub struct FleetAdapter;

impl FleetAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl BackendAdapter for FleetAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Fleet
    }

    fn path(&self) -> String {
        AGENTS_PATH.to_string()
    }

    fn degradation(&self) -> Degradation {
        Degradation::Soft
    }

    fn conductor(&self) -> Conductor {
        SUPERVISOR
    }

    fn normalize(&self, payload: &Value) -> Result<Vec<UnifiedAgent>, FetchError> {
        let records = records_at(payload, &["data"])?;
        Ok(group_records(&GROUPING, records))
    }
}

//! Kanban task board backend.
//!
//! `GET /api/kanban/tasks` returns `{ "data": [task, ...] }`. Each task names
//! the `runner` working it; tasks are grouped per runner.

use sb_core::status;
use sb_core::types::{BackendKind, UnifiedAgent};
use serde_json::Value;

use crate::adapter::{BackendAdapter, Conductor, Degradation};
use crate::grouping::{group_records, records_at, GroupSpec};
use crate::http::FetchError;

pub const TASKS_PATH: &str = "/api/kanban/tasks";

const GROUPING: GroupSpec = GroupSpec {
    backend: BackendKind::Kanban,
    key_field: "runner",
    default_key: "unassigned",
    status_fields: &["status"],
    timestamp_fields: &["updated_at", "updatedAt"],
    model_field: "model",
    mission_field: "mission_id",
    role: "runner",
    table: &status::KANBAN,
};

const SCHEDULER: Conductor = Conductor {
    native_id: "scheduler",
    name: "Kanban scheduler",
    role: "scheduler",
};

#[derive(Debug, Clone, Copy, Default)]
pub struct KanbanAdapter;

impl KanbanAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl BackendAdapter for KanbanAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Kanban
    }

    fn path(&self) -> String {
        TASKS_PATH.to_string()
    }

    fn degradation(&self) -> Degradation {
        Degradation::Soft
    }

    fn conductor(&self) -> Conductor {
        SCHEDULER
    }

    fn normalize(&self, payload: &Value) -> Result<Vec<UnifiedAgent>, FetchError> {
        let records = records_at(payload, &["data"])?;
        Ok(group_records(&GROUPING, records))
    }
}

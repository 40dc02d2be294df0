//! Per-backend status vocabularies.
//!
//! Every backend reports free-form status strings. Each one gets a closed
//! lookup table here; anything the table does not list falls through to
//! [`CanonicalStatus::Idle`]. Lookups never fail.

use crate::types::{BackendKind, CanonicalStatus};

use CanonicalStatus::*;

/// A finite native-status -> canonical-status table with an `idle` default.
///
/// Keys are stored in normalized form: lowercase, with `-` and spaces
/// written as `_`.
#[derive(Debug, Clone, Copy)]
pub struct StatusTable {
    entries: &'static [(&'static str, CanonicalStatus)],
}

impl StatusTable {
    pub const fn new(entries: &'static [(&'static str, CanonicalStatus)]) -> Self {
        Self { entries }
    }

    /// Canonicalize a native status. Total over all inputs.
    pub fn map(&self, native: Option<&str>) -> CanonicalStatus {
        let Some(native) = native else {
            return Idle;
        };
        let key = normalize(native);
        if key.is_empty() {
            return Idle;
        }
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, s)| *s)
            .unwrap_or(Idle)
    }

    pub fn entries(&self) -> &'static [(&'static str, CanonicalStatus)] {
        self.entries
    }
}

fn normalize(native: &str) -> String {
    native
        .trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

pub const KANBAN: StatusTable = StatusTable::new(&[
    ("backlog", Idle),
    ("todo", Idle),
    ("queued", Idle),
    ("pending", Idle),
    ("ready", Idle),
    ("in_progress", Working),
    ("running", Working),
    ("doing", Working),
    ("active", Working),
    ("blocked", Blocked),
    ("needs_input", Blocked),
    ("waiting", Blocked),
    ("review", Blocked),
    ("in_review", Blocked),
    ("done", Done),
    ("completed", Done),
    ("merged", Done),
    ("closed", Done),
    ("failed", Error),
    ("error", Error),
    ("errored", Error),
    ("cancelled", Error),
    ("paused", Paused),
    ("on_hold", Paused),
    ("parked", Paused),
]);

pub const ACTIONS: StatusTable = StatusTable::new(&[
    ("queued", Idle),
    ("pending", Idle),
    ("scheduled", Idle),
    ("running", Working),
    ("executing", Working),
    ("in_progress", Working),
    ("started", Working),
    ("awaiting_approval", Blocked),
    ("waiting_for_input", Blocked),
    ("needs_review", Blocked),
    ("blocked", Blocked),
    ("completed", Done),
    ("succeeded", Done),
    ("success", Done),
    ("done", Done),
    ("failed", Error),
    ("errored", Error),
    ("error", Error),
    ("rejected", Error),
    ("timed_out", Error),
    ("suspended", Paused),
    ("paused", Paused),
    ("deferred", Paused),
]);

pub const FLEET: StatusTable = StatusTable::new(&[
    ("idle", Idle),
    ("ready", Idle),
    ("available", Idle),
    ("online", Idle),
    ("busy", Working),
    ("running", Working),
    ("working", Working),
    ("thinking", Working),
    ("executing", Working),
    ("waiting", Blocked),
    ("awaiting_input", Blocked),
    ("stalled", Blocked),
    ("blocked", Blocked),
    ("finished", Done),
    ("complete", Done),
    ("completed", Done),
    ("exited", Done),
    ("crashed", Error),
    ("error", Error),
    ("failed", Error),
    ("unhealthy", Error),
    ("offline", Error),
    ("paused", Paused),
    ("suspended", Paused),
    ("sleeping", Paused),
]);

/// The table owned by `backend`.
pub fn table_for(backend: BackendKind) -> &'static StatusTable {
    match backend {
        BackendKind::Kanban => &KANBAN,
        BackendKind::Actions => &ACTIONS,
        BackendKind::Fleet => &FLEET,
    }
}

/// Canonicalize `native` using `backend`'s table.
pub fn map_status(backend: BackendKind, native: Option<&str>) -> CanonicalStatus {
    table_for(backend).map(native)
}

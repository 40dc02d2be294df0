//! Collapse low-level backend records into one agent per runner.
//!
//! The group map lives only for the duration of [`group_records`]; nothing
//! here is shared between calls.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use sb_core::status::StatusTable;
use sb_core::types::{BackendKind, CanonicalStatus, RawRecord, UnifiedAgent};
use serde_json::Value;

use crate::http::FetchError;

/// Which record fields an adapter reads. Everything else stays in `raw`.
#[derive(Debug, Clone, Copy)]
pub struct GroupSpec {
    pub backend: BackendKind,
    pub key_field: &'static str,
    /// Group used for records without a usable key.
    pub default_key: &'static str,
    /// Tried in order; first non-empty wins.
    pub status_fields: &'static [&'static str],
    pub timestamp_fields: &'static [&'static str],
    pub model_field: &'static str,
    pub mission_field: &'static str,
    /// Role shown when the representative record has no `role` field.
    pub role: &'static str,
    pub table: &'static StatusTable,
}

/// Locate the record array inside `payload` by following `path`.
pub fn records_at<'a>(payload: &'a Value, path: &[&str]) -> Result<&'a [Value], FetchError> {
    let mut cursor = payload;
    for segment in path {
        cursor = cursor.get(segment).ok_or_else(|| {
            FetchError::Payload(format!("missing `{}`", path.join(".")))
        })?;
    }
    cursor
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| FetchError::Payload(format!("expected array at `{}`", path.join("."))))
}

/// Read a field as text. Numbers are rendered; blank strings count as absent.
pub fn text_field(record: &RawRecord, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_text(record: &RawRecord, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|f| text_field(record, f))
}

/// `true` when timestamp `a` is strictly later than `b`. RFC 3339 values are
/// compared as instants; anything else falls back to string order.
fn is_later(a: &str, b: &str) -> bool {
    let parse = |s: &str| DateTime::<FixedOffset>::parse_from_rfc3339(s).ok();
    match (parse(a), parse(b)) {
        (Some(x), Some(y)) => x > y,
        _ => a > b,
    }
}

struct Group<'a> {
    status: CanonicalStatus,
    representative: &'a RawRecord,
    representative_at: Option<String>,
    latest_at: Option<String>,
    model: Option<String>,
}

impl<'a> Group<'a> {
    fn new(record: &'a RawRecord, status: CanonicalStatus, at: Option<String>, model: Option<String>) -> Self {
        Self {
            status,
            representative: record,
            representative_at: at.clone(),
            latest_at: at,
            model,
        }
    }

    fn absorb(&mut self, record: &'a RawRecord, status: CanonicalStatus, at: Option<String>, model: Option<String>) {
        let takes_over = if status.precedence() != self.status.precedence() {
            status.precedence() > self.status.precedence()
        } else {
            match (&at, &self.representative_at) {
                (Some(new), Some(old)) => is_later(new, old),
                (Some(_), None) => true,
                _ => false,
            }
        };
        if takes_over {
            self.status = status;
            self.representative = record;
            self.representative_at = at.clone();
        }

        if let Some(at) = at {
            let newer = match &self.latest_at {
                Some(latest) => is_later(&at, latest),
                None => true,
            };
            if newer {
                self.latest_at = Some(at);
            }
        }

        if self.model.is_none() {
            self.model = model;
        }
    }
}

/// Group `records` by `spec.key_field` and build one agent per group.
///
/// The group status is the dominant canonical status among its members (see
/// [`CanonicalStatus::precedence`]). The member holding that status is the
/// representative: its record becomes `raw` and supplies the mission id.
/// Equal-status members are tie-broken by most recent timestamp, then by
/// first seen. Records that are not JSON objects are skipped.
pub fn group_records(spec: &GroupSpec, records: &[Value]) -> Vec<UnifiedAgent> {
    let mut groups: BTreeMap<String, Group<'_>> = BTreeMap::new();

    for record in records.iter().filter_map(Value::as_object) {
        let key = text_field(record, spec.key_field).unwrap_or_else(|| spec.default_key.to_string());
        let native_status = first_text(record, spec.status_fields);
        let status = spec.table.map(native_status.as_deref());
        let at = first_text(record, spec.timestamp_fields);
        let model = text_field(record, spec.model_field);

        match groups.entry(key) {
            Entry::Occupied(mut entry) => entry.get_mut().absorb(record, status, at, model),
            Entry::Vacant(entry) => {
                entry.insert(Group::new(record, status, at, model));
            }
        }
    }

    groups
        .into_iter()
        .map(|(key, group)| {
            let role = text_field(group.representative, "role").unwrap_or_else(|| spec.role.to_string());
            let mission = text_field(group.representative, spec.mission_field);
            UnifiedAgent::new(spec.backend, key.clone(), key, role, group.status)
                .with_model(group.model)
                .with_mission(mission)
                .with_last_active(group.latest_at)
                .with_raw(group.representative.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SPEC: GroupSpec = GroupSpec {
        backend: BackendKind::Kanban,
        key_field: "runner",
        default_key: "unassigned",
        status_fields: &["status"],
        timestamp_fields: &["updated_at"],
        model_field: "model",
        mission_field: "mission_id",
        role: "runner",
        table: &sb_core::status::KANBAN,
    };

    fn records(v: Value) -> Vec<Value> {
        v.as_array().cloned().unwrap()
    }

    #[test]
    fn working_upgrades_group() {
        let recs = records(json!([
            {"runner": "r1", "status": "done"},
            {"runner": "r1", "status": "in_progress"}
        ]));
        let agents = group_records(&SPEC, &recs);
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].id, "kanban::r1");
        assert_eq!(agents[0].status, CanonicalStatus::Working);
        assert_eq!(agents[0].raw["status"], "in_progress");
    }

    #[test]
    fn working_first_is_not_downgraded() {
        let recs = records(json!([
            {"runner": "r1", "status": "in_progress"},
            {"runner": "r1", "status": "failed"},
            {"runner": "r1", "status": "blocked"}
        ]));
        let agents = group_records(&SPEC, &recs);
        assert_eq!(agents[0].status, CanonicalStatus::Working);
    }

    #[test]
    fn blocked_beats_error_beats_paused_beats_done_beats_idle() {
        let cases = [
            (json!(["todo", "done"]), CanonicalStatus::Done),
            (json!(["done", "paused"]), CanonicalStatus::Paused),
            (json!(["paused", "failed"]), CanonicalStatus::Error),
            (json!(["failed", "blocked"]), CanonicalStatus::Blocked),
        ];
        for (statuses, expected) in cases {
            let recs: Vec<Value> = statuses
                .as_array()
                .unwrap()
                .iter()
                .map(|s| json!({"runner": "r", "status": s}))
                .collect();
            assert_eq!(group_records(&SPEC, &recs)[0].status, expected, "{statuses}");
        }
    }

    #[test]
    fn missing_key_falls_back_to_default_group() {
        let recs = records(json!([
            {"status": "todo"},
            {"runner": "", "status": "todo"},
            {"runner": "r2", "status": "todo"}
        ]));
        let agents = group_records(&SPEC, &recs);
        let ids: Vec<&str> = agents.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["kanban::r2", "kanban::unassigned"]);
    }

    #[test]
    fn numeric_keys_are_accepted() {
        let recs = records(json!([{"runner": 7, "status": "todo"}]));
        assert_eq!(group_records(&SPEC, &recs)[0].native_id, "7");
    }

    #[test]
    fn latest_timestamp_and_first_model_win() {
        let recs = records(json!([
            {"runner": "r1", "status": "done", "updated_at": "2026-03-01T10:00:00Z"},
            {"runner": "r1", "status": "done", "updated_at": "2026-03-01T12:00:00+01:00", "model": "opus"},
            {"runner": "r1", "status": "done", "updated_at": "2026-03-01T10:30:00Z", "model": "haiku"}
        ]));
        let agent = &group_records(&SPEC, &recs)[0];
        // 12:00+01:00 is 11:00Z, the latest instant.
        assert_eq!(agent.last_active_at.as_deref(), Some("2026-03-01T12:00:00+01:00"));
        assert_eq!(agent.model.as_deref(), Some("opus"));
        assert_eq!(agent.raw["updated_at"], "2026-03-01T12:00:00+01:00");
    }

    #[test]
    fn mission_comes_from_representative() {
        let recs = records(json!([
            {"runner": "r1", "status": "done", "mission_id": "m-old"},
            {"runner": "r1", "status": "running", "mission_id": "m-now"}
        ]));
        let agent = &group_records(&SPEC, &recs)[0];
        assert_eq!(agent.current_mission_id.as_deref(), Some("m-now"));
    }

    #[test]
    fn record_role_overrides_default() {
        let recs = records(json!([{"runner": "r1", "status": "todo", "role": "reviewer"}]));
        assert_eq!(group_records(&SPEC, &recs)[0].role, "reviewer");
    }

    #[test]
    fn non_objects_are_skipped() {
        let recs = records(json!([1, "x", null, {"runner": "r1", "status": "todo"}]));
        assert_eq!(group_records(&SPEC, &recs).len(), 1);
        assert!(group_records(&SPEC, &records(json!([1, 2]))).is_empty());
    }

    #[test]
    fn records_at_follows_nested_path() {
        let payload = json!({"data": {"actions": [{"a": 1}]}});
        assert_eq!(records_at(&payload, &["data", "actions"]).unwrap().len(), 1);

        let err = records_at(&payload, &["data"]).unwrap_err();
        assert_eq!(err.to_string(), "Malformed payload: expected array at `data`");

        let err = records_at(&json!({}), &["data"]).unwrap_err();
        assert_eq!(err.to_string(), "Malformed payload: missing `data`");
    }
}

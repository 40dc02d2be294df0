use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Untyped backend record carried verbatim on every [`UnifiedAgent`].
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// CanonicalStatus
// ---------------------------------------------------------------------------

/// The closed set of states any backend status is normalized into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalStatus {
    /// No current activity.
    Idle,
    /// Actively processing.
    Working,
    /// Needs external input or attention.
    Blocked,
    /// Terminal success.
    Done,
    /// Terminal or operational failure.
    Error,
    /// Intentionally suspended.
    Paused,
}

impl CanonicalStatus {
    pub const ALL: [CanonicalStatus; 6] = [
        CanonicalStatus::Idle,
        CanonicalStatus::Working,
        CanonicalStatus::Blocked,
        CanonicalStatus::Done,
        CanonicalStatus::Error,
        CanonicalStatus::Paused,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalStatus::Idle => "idle",
            CanonicalStatus::Working => "working",
            CanonicalStatus::Blocked => "blocked",
            CanonicalStatus::Done => "done",
            CanonicalStatus::Error => "error",
            CanonicalStatus::Paused => "paused",
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            CanonicalStatus::Idle => "*",
            CanonicalStatus::Working => "@",
            CanonicalStatus::Blocked => "!",
            CanonicalStatus::Done => "+",
            CanonicalStatus::Error => "x",
            CanonicalStatus::Paused => "~",
        }
    }

    /// Rank used when several records collapse into one agent.
    ///
    /// The order is total: `working > blocked > error > paused > done > idle`.
    /// A runner doing anything right now outranks one waiting on a human,
    /// which outranks a failure, and so on down to `idle`, which is also the
    /// fallback for unrecognized strings and therefore never hides a real
    /// state.
    pub fn precedence(&self) -> u8 {
        match self {
            CanonicalStatus::Working => 5,
            CanonicalStatus::Blocked => 4,
            CanonicalStatus::Error => 3,
            CanonicalStatus::Paused => 2,
            CanonicalStatus::Done => 1,
            CanonicalStatus::Idle => 0,
        }
    }

    /// Returns whichever of `self` and `other` ranks higher.
    pub fn dominant(self, other: CanonicalStatus) -> CanonicalStatus {
        if other.precedence() > self.precedence() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// BackendKind
// ---------------------------------------------------------------------------

/// Known agent execution backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Kanban,
    Actions,
    Fleet,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [BackendKind::Kanban, BackendKind::Actions, BackendKind::Fleet];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Kanban => "kanban",
            BackendKind::Actions => "actions",
            BackendKind::Fleet => "fleet",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown backend {0:?} (expected one of: kanban, actions, fleet)")]
pub struct UnknownBackend(pub String);

impl FromStr for BackendKind {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kanban" => Ok(BackendKind::Kanban),
            "actions" => Ok(BackendKind::Actions),
            "fleet" => Ok(BackendKind::Fleet),
            _ => Err(UnknownBackend(s.to_string())),
        }
    }
}

/// Build the backend-scoped identity `"<backend>::<native_id>"`.
pub fn composite_id(backend: BackendKind, native_id: &str) -> String {
    format!("{}::{}", backend.as_str(), native_id)
}

// ---------------------------------------------------------------------------
// UnifiedAgent
// ---------------------------------------------------------------------------

/// One logical execution unit as seen by the dashboard.
///
/// Values are built once per poll cycle and never edited afterwards; the
/// composite `id` is the only identity that survives across cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedAgent {
    pub id: String,
    pub backend: BackendKind,
    pub native_id: String,
    pub name: String,
    pub role: String,
    pub status: CanonicalStatus,
    pub model: Option<String>,
    pub current_mission_id: Option<String>,
    pub last_active_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub raw: RawRecord,
}

impl UnifiedAgent {
    pub fn new(
        backend: BackendKind,
        native_id: impl Into<String>,
        name: impl Into<String>,
        role: impl Into<String>,
        status: CanonicalStatus,
    ) -> Self {
        let native_id = native_id.into();
        Self {
            id: composite_id(backend, &native_id),
            backend,
            native_id,
            name: name.into(),
            role: role.into(),
            status,
            model: None,
            current_mission_id: None,
            last_active_at: None,
            error_message: None,
            raw: RawRecord::new(),
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_mission(mut self, mission_id: Option<String>) -> Self {
        self.current_mission_id = mission_id;
        self
    }

    pub fn with_last_active(mut self, at: Option<String>) -> Self {
        self.last_active_at = at;
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_raw(mut self, raw: RawRecord) -> Self {
        self.raw = raw;
        self
    }

    /// `true` for placeholder nodes standing in for a failed fetch.
    pub fn is_degraded(&self) -> bool {
        self.error_message.is_some()
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// The merged result of one aggregation cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    pub agents: Vec<UnifiedAgent>,
}

impl Snapshot {
    pub fn new(agents: Vec<UnifiedAgent>) -> Self {
        Self {
            taken_at: Utc::now(),
            agents,
        }
    }

    pub fn ids(&self) -> BTreeSet<&str> {
        self.agents.iter().map(|a| a.id.as_str()).collect()
    }

    /// Agent count per canonical status, in [`CanonicalStatus::ALL`] order.
    pub fn status_counts(&self) -> Vec<(CanonicalStatus, usize)> {
        CanonicalStatus::ALL
            .iter()
            .map(|s| (*s, self.agents.iter().filter(|a| a.status == *s).count()))
            .collect()
    }

    pub fn degraded(&self) -> impl Iterator<Item = &UnifiedAgent> {
        self.agents.iter().filter(|a| a.is_degraded())
    }
}

// ---------------------------------------------------------------------------
// Missions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Pending,
    Active,
    Met,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Done,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionStep {
    pub id: String,
    pub label: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// A dispatched unit of work. Owned by the mission service; the aggregation
/// core only reads its id off backend records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedMission {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: MissionStatus,
    #[serde(default)]
    pub assigned_agent_ids: Vec<String>,
    pub backend: BackendKind,
    #[serde(default)]
    pub native_run_id: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub steps: Option<Vec<MissionStep>>,
}

/// Body of a mission dispatch call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub backend: BackendKind,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Structured event posted to the external log sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    pub payload: serde_json::Value,
}

impl AgentEvent {
    pub fn new(event_type: impl Into<String>, source: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            source: source.into(),
            context_id: None,
            payload,
        }
    }

    pub fn with_context(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }
}

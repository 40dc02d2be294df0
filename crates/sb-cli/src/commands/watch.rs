use std::collections::BTreeMap;
use std::time::Duration;

use sb_backends::events::{EventEmitter, EMIT_TIMEOUT};
use sb_backends::AggregationEngine;
use sb_core::types::{AgentEvent, CanonicalStatus, Snapshot};
use serde_json::json;
use tracing::{debug, info};

pub const SNAPSHOT_EVENT: &str = "agents.snapshot";

/// What changed between two consecutive snapshots, keyed by composite id.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// `(id, before, after)` for agents present in both.
    pub changed: Vec<(String, CanonicalStatus, CanonicalStatus)>,
}

impl SnapshotDiff {
    pub fn between(prev: &Snapshot, next: &Snapshot) -> Self {
        let before: BTreeMap<&str, CanonicalStatus> =
            prev.agents.iter().map(|a| (a.id.as_str(), a.status)).collect();
        let after: BTreeMap<&str, CanonicalStatus> =
            next.agents.iter().map(|a| (a.id.as_str(), a.status)).collect();

        let mut diff = Self::default();
        for (id, status) in &after {
            match before.get(id) {
                None => diff.added.push(id.to_string()),
                Some(old) if old != status => diff.changed.push((id.to_string(), *old, *status)),
                Some(_) => {}
            }
        }
        diff.removed = before
            .keys()
            .filter(|id| !after.contains_key(*id))
            .map(|id| id.to_string())
            .collect();
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        lines.extend(self.added.iter().map(|id| format!("+ {id}")));
        lines.extend(self.removed.iter().map(|id| format!("- {id}")));
        lines.extend(
            self.changed
                .iter()
                .map(|(id, old, new)| format!("~ {id}: {old} -> {new}")),
        );
        lines
    }
}

/// Event payload summarising one cycle.
pub fn snapshot_event(cycle: u64, snapshot: &Snapshot, diff: &SnapshotDiff) -> AgentEvent {
    let counts: serde_json::Map<String, serde_json::Value> = snapshot
        .status_counts()
        .into_iter()
        .map(|(status, n)| (status.as_str().to_string(), json!(n)))
        .collect();
    AgentEvent::new(
        SNAPSHOT_EVENT,
        "sb-cli",
        json!({
            "takenAt": snapshot.taken_at,
            "total": snapshot.agents.len(),
            "degraded": snapshot.degraded().count(),
            "counts": counts,
            "added": diff.added,
            "removed": diff.removed,
            "changed": diff.changed.len(),
        }),
    )
    .with_context(format!("cycle-{cycle}"))
}

/// Run the `watch` subcommand. Stops after `cycles` polls, or on Ctrl-C.
///
/// Events are fire-and-forget while watching; the last one is awaited
/// (bounded by [`EMIT_TIMEOUT`]) before returning so it survives runtime
/// shutdown.
pub async fn run(
    engine: &AggregationEngine,
    emitter: &EventEmitter,
    interval: Duration,
    cycles: Option<u64>,
) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut previous = Snapshot::new(Vec::new());
    let mut cycle: u64 = 0;
    let mut last_emit = None;

    loop {
        if cycles.is_some_and(|max| cycle >= max) {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("watch interrupted");
                break;
            }
        }

        cycle += 1;
        let snapshot = engine.snapshot().await;
        let diff = SnapshotDiff::between(&previous, &snapshot);

        if cycle == 1 {
            print!("{}", super::status::render(&snapshot));
        } else if !diff.is_empty() {
            println!("[{}]", snapshot.taken_at.format("%H:%M:%S"));
            for line in diff.lines() {
                println!("  {line}");
            }
        }

        last_emit = emitter.emit(snapshot_event(cycle, &snapshot, &diff)).or(last_emit);
        previous = snapshot;
    }

    if let Some(handle) = last_emit {
        if tokio::time::timeout(EMIT_TIMEOUT, handle).await.is_err() {
            debug!("final snapshot event still pending at exit");
        }
    }

    Ok(())
}

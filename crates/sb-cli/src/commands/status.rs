use std::fmt::Write as _;

use sb_backends::AggregationEngine;
use sb_core::types::Snapshot;

/// Run the `status` subcommand: poll every backend once and print the result.
pub async fn run(engine: &AggregationEngine, json: bool) -> anyhow::Result<()> {
    let snapshot = engine.snapshot().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", render(&snapshot));
    }
    Ok(())
}

/// Human-readable table of a snapshot, sorted by composite id.
pub fn render(snapshot: &Snapshot) -> String {
    let mut agents: Vec<_> = snapshot.agents.iter().collect();
    agents.sort_by(|a, b| a.id.cmp(&b.id));

    let mut out = String::new();
    let _ = writeln!(
        out,
        "agent-switchboard  ({})",
        snapshot.taken_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "{}", "-".repeat(88));

    if agents.is_empty() {
        let _ = writeln!(out, "No backends enabled.");
        return out;
    }

    let _ = writeln!(
        out,
        "  {:<28} {:<9} {:<14} {:<18} {}",
        "AGENT", "STATUS", "MODEL", "MISSION", "LAST ACTIVE"
    );
    for agent in &agents {
        let _ = writeln!(
            out,
            "{} {:<28} {:<9} {:<14} {:<18} {}",
            agent.status.glyph(),
            agent.id,
            agent.status.as_str(),
            agent.model.as_deref().unwrap_or("-"),
            agent.current_mission_id.as_deref().unwrap_or("-"),
            agent.last_active_at.as_deref().unwrap_or("-"),
        );
        if let Some(msg) = &agent.error_message {
            let _ = writeln!(out, "    ! {msg}");
        }
    }

    let _ = writeln!(out, "{}", "-".repeat(88));
    let counts: Vec<String> = snapshot
        .status_counts()
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .map(|(status, n)| format!("{status}: {n}"))
        .collect();
    let _ = writeln!(out, "{} agents  ({})", agents.len(), counts.join(", "));
    out
}

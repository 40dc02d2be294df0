//! Fire-and-forget event emission to the external log sink.

use std::time::Duration;

use sb_core::types::AgentEvent;
use tokio::task::JoinHandle;
use tracing::debug;

pub const EVENTS_PATH: &str = "/api/events";

/// Per-event delivery bound.
pub const EMIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Posts [`AgentEvent`]s on background tasks. Callers are never blocked and
/// failed posts are dropped after a debug log line.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    sink_url: Option<String>,
    client: reqwest::Client,
}

impl EventEmitter {
    pub fn new(sink_url: Option<&str>, client: reqwest::Client) -> Self {
        Self {
            sink_url: sink_url.map(|u| u.trim_end_matches('/').to_string()),
            client,
        }
    }

    /// An emitter that discards everything.
    pub fn disabled() -> Self {
        Self::new(None, reqwest::Client::new())
    }

    pub fn is_enabled(&self) -> bool {
        self.sink_url.is_some()
    }

    /// Queue `event` for delivery. Returns the background task so tests can
    /// wait on it; production callers drop the handle.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn emit(&self, event: AgentEvent) -> Option<JoinHandle<()>> {
        let url = format!("{}{}", self.sink_url.as_ref()?, EVENTS_PATH);
        let client = self.client.clone();

        Some(tokio::spawn(async move {
            let result = client
                .post(&url)
                .timeout(EMIT_TIMEOUT)
                .json(&event)
                .send()
                .await;
            match result {
                Ok(resp) if resp.status().is_success() => {
                    debug!(event_type = %event.event_type, "event delivered");
                }
                Ok(resp) => {
                    debug!(event_type = %event.event_type, status = resp.status().as_u16(), "event sink rejected event");
                }
                Err(err) => {
                    debug!(event_type = %event.event_type, error = %err, "event emission failed");
                }
            }
        }))
    }
}

use async_trait::async_trait;
use sb_core::types::{BackendKind, CanonicalStatus, UnifiedAgent};
use serde_json::Value;
use tracing::{debug, warn};

use crate::http::{BackendHttp, FetchError};

/// Where and how to reach one backend for one poll.
#[derive(Clone, PartialEq, Eq)]
pub struct BackendTarget {
    pub base_url: String,
    pub token: Option<String>,
}

impl BackendTarget {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl std::fmt::Debug for BackendTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendTarget")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// How an adapter reports a backend it could not reach at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degradation {
    /// Unreachable backends show as `idle`; the outage is likely transient.
    Soft,
    /// Unreachable backends show as `error`.
    Hard,
}

/// The backend-wide role used for placeholder nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conductor {
    pub native_id: &'static str,
    pub name: &'static str,
    pub role: &'static str,
}

impl Conductor {
    pub fn node(&self, backend: BackendKind, status: CanonicalStatus) -> UnifiedAgent {
        UnifiedAgent::new(backend, self.native_id, self.name, self.role, status)
    }
}

/// One agent execution backend.
///
/// Implementors describe the backend (path, payload shape, vocabulary);
/// the provided [`BackendAdapter::fetch_agents`] does the request and folds
/// every failure into a degraded node. Adapters hold no mutable state, so one
/// instance can serve any number of overlapping polls.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Path (and query) appended to the target's base URL.
    fn path(&self) -> String;

    fn degradation(&self) -> Degradation;

    fn conductor(&self) -> Conductor;

    /// Turn a successful payload into grouped agents. An empty result is
    /// allowed; it becomes one idle conductor node.
    fn normalize(&self, payload: &Value) -> Result<Vec<UnifiedAgent>, FetchError>;

    /// Poll the backend once. Always returns at least one agent.
    async fn fetch_agents(&self, http: &BackendHttp, target: &BackendTarget) -> Vec<UnifiedAgent> {
        let kind = self.kind();
        let url = target.url(&self.path());
        debug!(backend = %kind, %url, "polling backend");

        let result = match http.get_json(&url, target.token.as_deref()).await {
            Ok(payload) => self.normalize(&payload),
            Err(err) => Err(err),
        };

        match result {
            Ok(agents) if agents.is_empty() => {
                debug!(backend = %kind, "backend reachable but reported no records");
                vec![self.conductor().node(kind, CanonicalStatus::Idle)]
            }
            Ok(agents) => {
                debug!(backend = %kind, agents = agents.len(), "backend normalized");
                agents
            }
            Err(err) => {
                warn!(backend = %kind, %url, error = %err, "backend degraded");
                vec![degraded_node(kind, self.conductor(), self.degradation(), &err)]
            }
        }
    }
}

/// The single placeholder emitted for a failed fetch.
pub fn degraded_node(
    backend: BackendKind,
    conductor: Conductor,
    policy: Degradation,
    err: &FetchError,
) -> UnifiedAgent {
    let status = if err.is_transient() && policy == Degradation::Soft {
        CanonicalStatus::Idle
    } else {
        CanonicalStatus::Error
    };
    conductor.node(backend, status).with_error(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONDUCTOR: Conductor = Conductor {
        native_id: "scheduler",
        name: "Scheduler",
        role: "scheduler",
    };

    #[test]
    fn target_trims_trailing_slash() {
        let target = BackendTarget::new("http://localhost:3000/");
        assert_eq!(target.url("/api/x"), "http://localhost:3000/api/x");
    }

    #[test]
    fn soft_backends_go_idle_on_transport_failure() {
        let node = degraded_node(
            BackendKind::Kanban,
            CONDUCTOR,
            Degradation::Soft,
            &FetchError::Timeout(5000),
        );
        assert_eq!(node.status, CanonicalStatus::Idle);
        assert_eq!(node.id, "kanban::scheduler");
        assert_eq!(node.error_message.as_deref(), Some("timed out after 5000 ms"));
        assert!(node.raw.is_empty());
    }

    #[test]
    fn hard_backends_go_error_on_transport_failure() {
        let node = degraded_node(
            BackendKind::Actions,
            CONDUCTOR,
            Degradation::Hard,
            &FetchError::Transport("connection refused".into()),
        );
        assert_eq!(node.status, CanonicalStatus::Error);
        assert_eq!(node.error_message.as_deref(), Some("connection refused"));
    }

    #[test]
    fn answered_failures_are_errors_even_when_soft() {
        for err in [
            FetchError::Unauthorized { token_sent: false },
            FetchError::Status(500),
            FetchError::Payload("expected array at `data`".into()),
        ] {
            let node = degraded_node(BackendKind::Fleet, CONDUCTOR, Degradation::Soft, &err);
            assert_eq!(node.status, CanonicalStatus::Error, "{err}");
            assert_eq!(node.error_message, Some(err.to_string()));
        }
    }
}

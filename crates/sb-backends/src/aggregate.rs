use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use sb_core::config::{Config, CredentialProvider};
use sb_core::types::{BackendKind, Snapshot, UnifiedAgent};
use tracing::info;

use crate::actions::ActionsAdapter;
use crate::adapter::{BackendAdapter, BackendTarget};
use crate::fleet::FleetAdapter;
use crate::http::BackendHttp;
use crate::kanban::KanbanAdapter;

/// An adapter paired with the endpoint it polls.
#[derive(Clone)]
pub struct AdapterBinding {
    pub adapter: Arc<dyn BackendAdapter>,
    pub target: BackendTarget,
}

impl AdapterBinding {
    pub fn new(adapter: Arc<dyn BackendAdapter>, target: BackendTarget) -> Self {
        Self { adapter, target }
    }

    pub fn kind(&self) -> BackendKind {
        self.adapter.kind()
    }
}

impl std::fmt::Debug for AdapterBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterBinding")
            .field("backend", &self.adapter.kind())
            .field("base_url", &self.target.base_url)
            .field("token", &self.target.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Poll every binding concurrently and concatenate the results.
///
/// Adapters never fail, so this always settles once the slowest adapter hits
/// its own timeout. Degraded nodes are passed through untouched and the
/// output order is unspecified.
pub async fn aggregate(http: &BackendHttp, bindings: &[AdapterBinding]) -> Vec<UnifiedAgent> {
    let polls = bindings
        .iter()
        .map(|binding| binding.adapter.fetch_agents(http, &binding.target));
    join_all(polls).await.into_iter().flatten().collect()
}

/// The set of configured backends plus the shared HTTP client.
#[derive(Debug, Clone)]
pub struct AggregationEngine {
    http: BackendHttp,
    bindings: Vec<AdapterBinding>,
}

impl AggregationEngine {
    pub fn new(http: BackendHttp) -> Self {
        Self {
            http,
            bindings: Vec::new(),
        }
    }

    pub fn with_binding(mut self, adapter: Arc<dyn BackendAdapter>, target: BackendTarget) -> Self {
        self.bindings.push(AdapterBinding::new(adapter, target));
        self
    }

    /// Build the engine for every enabled backend in `config`, with tokens
    /// resolved from the environment.
    pub fn from_config(config: &Config) -> Self {
        let http = BackendHttp::new(Duration::from_millis(config.poll.timeout_ms));
        let backends = &config.backends;

        let mut engine = Self::new(http);
        for kind in BackendKind::ALL {
            if !backends.is_enabled(kind) {
                continue;
            }
            let adapter: Arc<dyn BackendAdapter> = match kind {
                BackendKind::Kanban => Arc::new(KanbanAdapter::new()),
                BackendKind::Actions => Arc::new(ActionsAdapter::new(
                    backends.actions.namespace.clone(),
                    backends.actions.limit,
                )),
                BackendKind::Fleet => Arc::new(FleetAdapter::new()),
            };
            let target = BackendTarget::new(backends.base_url(kind))
                .with_token(CredentialProvider::backend_token(backends, kind));
            engine = engine.with_binding(adapter, target);
        }
        engine
    }

    pub fn http(&self) -> &BackendHttp {
        &self.http
    }

    pub fn bindings(&self) -> &[AdapterBinding] {
        &self.bindings
    }

    /// Run one aggregation cycle.
    pub async fn aggregate(&self) -> Vec<UnifiedAgent> {
        let started = Instant::now();
        let agents = aggregate(&self.http, &self.bindings).await;
        info!(
            backends = self.bindings.len(),
            agents = agents.len(),
            degraded = agents.iter().filter(|a| a.is_degraded()).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "aggregation cycle complete"
        );
        agents
    }

    /// Run one cycle and stamp the result.
    pub async fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.aggregate().await)
    }
}

use std::time::Duration;

use thiserror::Error;
use tracing::debug;

/// Default hard bound on a single backend request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Everything that can go wrong while fetching one backend's status payload.
///
/// The `Display` text of each variant is what ends up in a degraded node's
/// `errorMessage`, so it is written for people looking at a dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The backend answered 401.
    #[error("Auth required ({})", auth_hint(.token_sent))]
    Unauthorized { token_sent: bool },

    /// Any other non-2xx status.
    #[error("API returned {0}")]
    Status(u16),

    /// The request did not complete within the configured bound.
    #[error("timed out after {0} ms")]
    Timeout(u64),

    /// Connection refused, DNS failure, reset, truncated body, ...
    #[error("{0}")]
    Transport(String),

    /// The body was not JSON, or the records were not where the adapter
    /// expects them.
    #[error("Malformed payload: {0}")]
    Payload(String),
}

fn auth_hint(token_sent: &bool) -> &'static str {
    if *token_sent {
        "token rejected"
    } else {
        "no token"
    }
}

impl FetchError {
    /// `true` for failures where the backend may simply be unreachable for
    /// a moment, as opposed to answering with something wrong.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Timeout(_) | FetchError::Transport(_))
    }
}

/// Result type alias for backend fetches.
pub type Result<T> = std::result::Result<T, FetchError>;

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Shared HTTP client for backend polling.
///
/// Cloning is cheap; clones share the underlying connection pool. The
/// client carries no per-backend state.
#[derive(Debug, Clone)]
pub struct BackendHttp {
    client: reqwest::Client,
    timeout: Duration,
}

impl Default for BackendHttp {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl BackendHttp {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("agent-switchboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, timeout }
    }

    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The underlying client, for collaborator calls that share the pool.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// GET `url` and parse the body as JSON, bounded by the configured
    /// timeout. The bound covers connect, headers and the full body.
    pub async fn get_json(&self, url: &str, token: Option<&str>) -> Result<serde_json::Value> {
        let timeout_ms = self.timeout.as_millis() as u64;
        match tokio::time::timeout(self.timeout, self.get_json_unbounded(url, token)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(timeout_ms)),
        }
    }

    async fn get_json_unbounded(
        &self,
        url: &str,
        token: Option<&str>,
    ) -> Result<serde_json::Value> {
        let mut req = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(transport_error)?;
        let status = resp.status();
        debug!(%url, status = status.as_u16(), "backend responded");

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(FetchError::Unauthorized {
                token_sent: token.is_some(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = resp.bytes().await.map_err(transport_error)?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Payload(format!("invalid JSON: {e}")))
    }
}

/// The client carries no timeout of its own, so every reqwest error here is
/// a transport failure; the bound is enforced by [`BackendHttp::get_json`].
fn transport_error(err: reqwest::Error) -> FetchError {
    FetchError::Transport(err.to_string())
}

//! Thin pass-through to the mission service.
//!
//! The switchboard does not own missions. Dispatch forwards the request once
//! and reports what came back; it never retries.

use sb_core::types::DispatchRequest;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub const MISSIONS_PATH: &str = "/api/missions";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("mission title must not be empty")]
    EmptyTitle,

    /// The mission service answered with a non-2xx status.
    #[error("dispatch rejected: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, DispatchError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub status: u16,
    /// Mission id, when the service reported one.
    pub mission_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MissionDispatcher {
    base_url: String,
    client: reqwest::Client,
}

impl MissionDispatcher {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchOutcome> {
        if request.title.trim().is_empty() {
            return Err(DispatchError::EmptyTitle);
        }

        let url = format!("{}{}", self.base_url, MISSIONS_PATH);
        let resp = self.client.post(&url).json(request).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = resp.json().await.unwrap_or_default();
        let mission_id = body["data"]["id"]
            .as_str()
            .or_else(|| body["id"].as_str())
            .map(str::to_string);

        info!(backend = %request.backend, title = %request.title, ?mission_id, "mission dispatched");
        Ok(DispatchOutcome {
            status: status.as_u16(),
            mission_id,
        })
    }
}

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::types::BackendKind;

/// Top-level configuration loaded from `~/.agent-switchboard/config.toml`.
///
/// **Security**: This struct NEVER stores backend tokens. It only records the
/// *name* of the env var holding each token; see [`CredentialProvider`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub backends: BackendsConfig,
    #[serde(default)]
    pub collaborators: CollaboratorsConfig,
}

impl Config {
    /// Load config from `~/.agent-switchboard/config.toml`, falling back to
    /// defaults when the file does not exist. Env overrides are applied on top.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        let mut cfg = if path.exists() {
            debug!(path = %path.display(), "loading config");
            let text =
                std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
            toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?
        } else {
            debug!(path = %path.display(), "config file not found, using defaults");
            Config::default()
        };
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a specific path. Env overrides are applied on top.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        debug!(path = %path.display(), "loading config");
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let mut cfg: Config =
            toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        self.validate()?;
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Override base URLs and the actions namespace from `SWITCHBOARD_*`
    /// environment variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Same as [`Config::apply_env_overrides`] with an explicit lookup, so
    /// callers (and tests) need not touch the process environment.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            let value = lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
            if value.is_some() {
                debug!(key, "config override from environment");
            }
            value
        };

        if let Some(url) = get("SWITCHBOARD_KANBAN_URL") {
            self.backends.kanban.base_url = url;
        }
        if let Some(url) = get("SWITCHBOARD_ACTIONS_URL") {
            self.backends.actions.base_url = url;
        }
        if let Some(ns) = get("SWITCHBOARD_ACTIONS_NAMESPACE") {
            self.backends.actions.namespace = ns;
        }
        if let Some(url) = get("SWITCHBOARD_FLEET_URL") {
            self.backends.fleet.base_url = url;
        }
        if let Some(url) = get("SWITCHBOARD_EVENT_SINK_URL") {
            self.collaborators.event_sink_url = Some(url);
        }
    }

    /// Semantic validation for settings that are not fully expressible via type checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.general.validate()?;
        self.poll.validate()?;
        self.backends.validate()?;
        self.collaborators.validate()
    }

    fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".agent-switchboard")
            .join("config.toml")
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
    #[error("validation: {0}")]
    Validation(String),
}

fn validate_url(field: &str, url: &str) -> Result<(), ConfigError> {
    if url.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} must not be empty")));
    }
    if url.trim() != url {
        return Err(ConfigError::Validation(format!(
            "{field} must not have surrounding whitespace, got {url:?}"
        )));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::Validation(format!(
            "{field} must be an http(s) URL, got {url:?}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Section structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// `"pretty"` or `"json"`.
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl GeneralConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.log_format.trim() {
            "pretty" | "json" => Ok(()),
            other => Err(ConfigError::Validation(format!(
                "general.log_format must be \"pretty\" or \"json\", got {other:?}"
            ))),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "pretty".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Hard bound on each backend request.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl PollConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "poll.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "poll.interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_interval_secs() -> u64 {
    5
}
fn default_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BackendsConfig {
    #[serde(default)]
    pub kanban: KanbanConfig,
    #[serde(default)]
    pub actions: ActionsConfig,
    #[serde(default)]
    pub fleet: FleetConfig,
}

impl BackendsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url("backends.kanban.base_url", &self.kanban.base_url)?;
        validate_url("backends.actions.base_url", &self.actions.base_url)?;
        validate_url("backends.fleet.base_url", &self.fleet.base_url)?;
        self.actions.validate()
    }

    pub fn is_enabled(&self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::Kanban => self.kanban.enabled,
            BackendKind::Actions => self.actions.enabled,
            BackendKind::Fleet => self.fleet.enabled,
        }
    }

    pub fn base_url(&self, kind: BackendKind) -> &str {
        match kind {
            BackendKind::Kanban => &self.kanban.base_url,
            BackendKind::Actions => &self.actions.base_url,
            BackendKind::Fleet => &self.fleet.base_url,
        }
    }

    /// Name of the env var holding `kind`'s bearer token.
    pub fn token_env(&self, kind: BackendKind) -> &str {
        match kind {
            BackendKind::Kanban => &self.kanban.token_env,
            BackendKind::Actions => &self.actions.token_env,
            BackendKind::Fleet => &self.fleet.token_env,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KanbanConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_kanban_url")]
    pub base_url: String,
    #[serde(default = "default_kanban_token_env")]
    pub token_env: String,
}

impl Default for KanbanConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_kanban_url(),
            token_env: default_kanban_token_env(),
        }
    }
}

fn default_kanban_url() -> String {
    "http://127.0.0.1:3000".into()
}
fn default_kanban_token_env() -> String {
    "KANBAN_API_TOKEN".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_fleet_url")]
    pub base_url: String,
    #[serde(default = "default_fleet_token_env")]
    pub token_env: String,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_fleet_url(),
            token_env: default_fleet_token_env(),
        }
    }
}

fn default_fleet_url() -> String {
    "http://127.0.0.1:4000".into()
}
fn default_fleet_token_env() -> String {
    "FLEET_API_TOKEN".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_actions_url")]
    pub base_url: String,
    #[serde(default = "default_actions_namespace")]
    pub namespace: String,
    /// Page size requested from the actions endpoint.
    #[serde(default = "default_actions_limit")]
    pub limit: u32,
    #[serde(default = "default_actions_token_env")]
    pub token_env: String,
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_actions_url(),
            namespace: default_actions_namespace(),
            limit: default_actions_limit(),
            token_env: default_actions_token_env(),
        }
    }
}

impl ActionsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ns = self.namespace.trim();
        if ns.is_empty() || ns.contains('/') {
            return Err(ConfigError::Validation(format!(
                "backends.actions.namespace must be a single non-empty path segment, got {:?}",
                self.namespace
            )));
        }
        if !(1..=1000).contains(&self.limit) {
            return Err(ConfigError::Validation(format!(
                "backends.actions.limit must be within 1..=1000, got {}",
                self.limit
            )));
        }
        Ok(())
    }
}

fn default_actions_url() -> String {
    "http://127.0.0.1:8080".into()
}
fn default_actions_namespace() -> String {
    "agents".into()
}
fn default_actions_limit() -> u32 {
    50
}
fn default_actions_token_env() -> String {
    "ACTIONS_API_TOKEN".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorsConfig {
    /// Base URL of the mission service receiving dispatch calls.
    #[serde(default = "default_dispatch_url")]
    pub dispatch_url: String,
    /// Base URL of the event log sink. `None` disables emission.
    #[serde(default)]
    pub event_sink_url: Option<String>,
}

impl Default for CollaboratorsConfig {
    fn default() -> Self {
        Self {
            dispatch_url: default_dispatch_url(),
            event_sink_url: None,
        }
    }
}

impl CollaboratorsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url("collaborators.dispatch_url", &self.dispatch_url)?;
        if let Some(sink) = &self.event_sink_url {
            validate_url("collaborators.event_sink_url", sink)?;
        }
        Ok(())
    }
}

fn default_dispatch_url() -> String {
    "http://127.0.0.1:3000".into()
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Reads backend tokens from environment variables at runtime.
///
/// Config stores env var *names*; this provider resolves them on demand.
pub struct CredentialProvider;

impl CredentialProvider {
    /// Token for `kind`, or `None` when its env var is unset or blank.
    pub fn backend_token(config: &BackendsConfig, kind: BackendKind) -> Option<String> {
        Self::resolve(config.token_env(kind))
    }

    /// Read a credential from the named env var.
    pub fn resolve(env_var: &str) -> Option<String> {
        if env_var.trim().is_empty() {
            return None;
        }
        std::env::var(env_var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

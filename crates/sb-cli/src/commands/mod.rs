pub mod dispatch;
pub mod status;
pub mod watch;

use std::path::Path;

use sb_core::config::Config;

/// Load config from `path`, or from the default location when `None`.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

/// Map common reqwest errors to user-friendly messages.
pub fn friendly_error(err: reqwest::Error) -> anyhow::Error {
    if err.is_connect() {
        anyhow::anyhow!(
            "Could not connect to the mission service. Is it running?\n  \
             (hint: check collaborators.dispatch_url in your config)"
        )
    } else if err.is_timeout() {
        anyhow::anyhow!("Request timed out. The mission service may be overloaded.")
    } else {
        anyhow::anyhow!("API request failed: {err}")
    }
}

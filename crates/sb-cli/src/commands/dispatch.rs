use sb_backends::dispatch::{DispatchError, MissionDispatcher};
use sb_core::types::DispatchRequest;

use super::friendly_error;

/// Run the `dispatch` subcommand: forward one mission to the mission service.
pub async fn run(dispatch_url: &str, request: &DispatchRequest) -> anyhow::Result<()> {
    let dispatcher = MissionDispatcher::new(dispatch_url, reqwest::Client::new());

    let outcome = dispatcher.dispatch(request).await.map_err(|err| match err {
        DispatchError::Http(e) => friendly_error(e),
        other => anyhow::Error::new(other),
    })?;

    match outcome.mission_id {
        Some(id) => println!("Dispatched mission {id} to {}", request.backend),
        None => println!(
            "Dispatched \"{}\" to {} (HTTP {})",
            request.title, request.backend, outcome.status
        ),
    }
    Ok(())
}

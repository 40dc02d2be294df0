mod commands;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use sb_backends::events::EventEmitter;
use sb_backends::AggregationEngine;
use sb_core::types::{BackendKind, DispatchRequest};
use sb_telemetry::logging::{self, LogFormat};

/// agent-switchboard CLI -- one status view over every agent backend.
#[derive(Parser)]
#[command(name = "sb", version, about)]
struct Cli {
    /// Config file (default: ~/.agent-switchboard/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines regardless of config.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll every backend once and print the agents (default).
    Status {
        /// Print the snapshot as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Poll repeatedly and print what changed between cycles.
    Watch {
        /// Seconds between cycles (default from config).
        #[arg(long)]
        interval: Option<u64>,
        /// Stop after this many cycles.
        #[arg(long)]
        cycles: Option<u64>,
    },

    /// Send a new mission to the mission service.
    Dispatch {
        /// Mission title.
        title: String,
        /// Backend that should run the mission.
        #[arg(long)]
        backend: BackendKind,
        /// Longer description.
        #[arg(short, long)]
        description: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        config.general.log_format.parse::<LogFormat>().unwrap_or_default()
    };
    logging::init("sb-cli", &config.general.log_level, format);

    match cli.command {
        None => {
            let engine = AggregationEngine::from_config(&config);
            commands::status::run(&engine, false).await?;
        }
        Some(Commands::Status { json }) => {
            let engine = AggregationEngine::from_config(&config);
            commands::status::run(&engine, json).await?;
        }
        Some(Commands::Watch { interval, cycles }) => {
            let engine = AggregationEngine::from_config(&config);
            let emitter = EventEmitter::new(
                config.collaborators.event_sink_url.as_deref(),
                engine.http().client().clone(),
            );
            let interval = Duration::from_secs(interval.unwrap_or(config.poll.interval_secs).max(1));
            commands::watch::run(&engine, &emitter, interval, cycles).await?;
        }
        Some(Commands::Dispatch {
            title,
            backend,
            description,
        }) => {
            let request = DispatchRequest {
                title,
                description,
                backend,
            };
            commands::dispatch::run(&config.collaborators.dispatch_url, &request).await?;
        }
    }

    Ok(())
}

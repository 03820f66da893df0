//! Submit a goal to the task engine (or attach to a running one) and print the
//! translated UI chunks to stdout, one JSON object per line.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use goal_bridge::Payload;
use goal_bridge::observability::init_observability;
use goal_bridge::prelude::*;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "goal-bridge", version, about)]
struct Cli {
    /// Engine base URL (overrides GOAL_ENGINE_URL).
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Bearer token for the engine (overrides GOAL_ENGINE_API_KEY).
    #[arg(long, global = true)]
    api_key: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Submit a new goal and stream its progress.
    Run {
        /// What the engine should accomplish.
        goal: String,
        /// Model identifier passed to the engine as-is.
        #[arg(long)]
        model: Option<String>,
        /// Extra metadata as a JSON object.
        #[arg(long, value_parser = parse_metadata)]
        metadata: Option<Payload>,
    },
    /// Stream the progress of an already submitted goal.
    Watch {
        /// Goal id returned by the engine.
        goal_id: String,
    },
}

/// Exit status for a stream cut short by Ctrl-C (128 + SIGINT).
const INTERRUPTED_EXIT: u8 = 130;

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Completed,
    Interrupted,
}

fn parse_metadata(raw: &str) -> Result<Payload, String> {
    serde_json::from_str(raw).map_err(|e| format!("metadata must be a JSON object: {e}"))
}

fn engine_config(cli: &Cli) -> EngineConfig {
    let mut config = EngineConfig::from_env();
    if let Some(url) = &cli.base_url {
        config = config.base_url(url.clone());
    }
    if let Some(key) = &cli.api_key {
        config = config.api_key(key.clone());
    }
    config
}

async fn run(cli: Cli) -> Result<Outcome, BridgeError> {
    let client = EngineClient::new(engine_config(&cli))?;
    let mut sink = JsonLinesSink::new(std::io::stdout().lock());

    let streaming = async {
        match cli.command {
            Command::Run {
                goal,
                model,
                metadata,
            } => {
                let mut request = GoalRequest::new(goal);
                if let Some(model) = model {
                    request = request.model(model);
                }
                if let Some(metadata) = metadata {
                    request = request.metadata(metadata);
                }
                let (goal_id, end) = client.run_goal(&request, &mut sink).await?;
                info!(goal_id = %goal_id, ?end, "goal stream finished");
            }
            Command::Watch { goal_id } => {
                let end = client.watch_goal(&GoalId::new(goal_id), &mut sink).await?;
                info!(?end, "goal stream finished");
            }
        }
        Ok::<_, BridgeError>(Outcome::Completed)
    };

    // Dropping the stream on Ctrl-C still closes any open text span.
    tokio::select! {
        result = streaming => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted; closing goal stream");
            Ok(Outcome::Interrupted)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_observability();

    let cli = Cli::parse();
    let result = run(cli).await;
    if let Err(err) = &result {
        eprintln!("goal-bridge: {err}");
    }
    ExitCode::from(exit_status(&result))
}

fn exit_status(result: &Result<Outcome, BridgeError>) -> u8 {
    match result {
        Ok(Outcome::Completed) => 0,
        Ok(Outcome::Interrupted) => INTERRUPTED_EXIT,
        Err(_) => 1,
    }
}

//! rocketwatch-beacon
//!
//! Operator CLI over the resilient beacon client.
//!
//! ```text
//!   config.toml ──▶ lifecycle::startup ──▶ AppContext { config, beacon }
//!                                              │
//!              block / header / validator / finality ──▶ one call, JSON on stdout
//!              watch ──▶ HeadWatcher loop until Ctrl+C
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;

use rocketwatch_beacon::config::load_config;
use rocketwatch_beacon::lifecycle::{self, signals, Shutdown};
use rocketwatch_beacon::observability::logging::init_logging;
use rocketwatch_beacon::watch::HeadWatcher;

#[derive(Parser)]
#[command(name = "rocketwatch-beacon")]
#[command(about = "Query beacon chain endpoints through a fallback chain", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "rocketwatch-beacon.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a signed beacon block (head, genesis, finalized, slot or root)
    Block { block_id: String },
    /// Fetch a block header
    Header { block_id: String },
    /// Fetch a validator by index or pubkey
    Validator {
        validator_id: String,
        #[arg(long, default_value = "head")]
        state: String,
    },
    /// Fetch finality checkpoints
    Finality {
        #[arg(default_value = "head")]
        state: String,
    },
    /// Poll the head block until interrupted
    Watch {
        #[arg(long, default_value_t = 12)]
        interval_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    init_logging(&config.observability);
    tracing::info!(config = %cli.config.display(), "rocketwatch-beacon v{} starting", env!("CARGO_PKG_VERSION"));

    let ctx = lifecycle::startup(config)?;
    let beacon = &ctx.beacon;

    let result = match cli.command {
        Commands::Block { block_id } => print_json(beacon.get_block(&block_id).await),
        Commands::Header { block_id } => print_json(beacon.get_block_header(&block_id).await),
        Commands::Validator { validator_id, state } => {
            print_json(beacon.get_validator(&state, &validator_id).await)
        }
        Commands::Finality { state } => print_json(beacon.get_finality_checkpoints(&state).await),
        Commands::Watch { interval_secs } => {
            let shutdown = Shutdown::new();
            signals::spawn_ctrl_c_handler(shutdown.clone());
            let watcher = HeadWatcher::new(beacon.clone(), Duration::from_secs(interval_secs.max(1)));
            watcher.run(shutdown.subscribe()).await;
            print_json(Ok(beacon.endpoint_status()))
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Command failed");
    }
    result
}

fn print_json<T: Serialize>(
    result: Result<T, rocketwatch_beacon::BeaconError>,
) -> Result<(), Box<dyn std::error::Error>> {
    let value = result?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

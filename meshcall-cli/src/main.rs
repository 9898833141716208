mod console;
mod simulation;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use meshcall_engine::EngineConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cargo-meshcall")]
#[command(bin_name = "cargo-meshcall")]
enum Cli {
    Meshcall(MeshcallArgs),
}

#[derive(clap::Args)]
struct MeshcallArgs {
    /// JSON file with engine settings. Missing fields keep their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    teardown_grace_ms: Option<u64>,

    #[arg(long, global = true)]
    offer_jitter_max_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run several participants in one process and let them call each other.
    Simulate {
        #[arg(long, default_value = "Lobby")]
        room: String,

        #[arg(short, long, default_value_t = 3)]
        peers: usize,

        #[arg(short, long, default_value_t = 15)]
        seconds: u64,
    },

    /// Drive one participant by hand while simulated colleagues sit in the room.
    Console {
        #[arg(long, default_value = "Lobby")]
        room: String,

        #[arg(long, default_value = "you")]
        name: String,

        #[arg(short, long, default_value_t = 2)]
        peers: usize,
    },
}

fn load_config(args: &MeshcallArgs) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    if let Some(grace) = args.teardown_grace_ms {
        config.teardown_grace_ms = grace;
    }
    if let Some(max) = args.offer_jitter_max_ms {
        config.offer_jitter_max_ms = max;
        config.offer_jitter_min_ms = config.offer_jitter_min_ms.min(max);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli::Meshcall(args) = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config(&args)?;

    match args.command {
        Commands::Simulate {
            room,
            peers,
            seconds,
        } => {
            println!("{}", "📞 Starting meshcall simulation...".green().bold());
            simulation::run(config, room, peers, seconds).await?;
            println!("{}", "✨ Simulation finished".green().bold());
        }
        Commands::Console { room, name, peers } => {
            console::run(config, room, name, peers).await?;
        }
    }

    Ok(())
}

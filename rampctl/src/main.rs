// Ramp-metering controller CLI
// Calibrate the reward scale, train a DQN agent and evaluate saved models

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{CalibrateArgs, EvaluateArgs, TrainArgs};
use config::RampConfig;

#[derive(Parser)]
#[command(name = "rampctl")]
#[command(about = "Reinforcement-learning ramp-metering controller", version)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an uncontrolled episode and derive the reward constants
    Calibrate(CalibrateArgs),

    /// Train an agent, keeping the best-scoring model
    Train(TrainArgs),

    /// Run a saved model greedily and report its decisions
    Evaluate(EvaluateArgs),
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = RampConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Calibrate(args) => commands::calibrate(&config, args).await?,
        Commands::Train(args) => commands::train(config, args).await?,
        Commands::Evaluate(args) => commands::evaluate(config, args).await?,
    }

    Ok(())
}

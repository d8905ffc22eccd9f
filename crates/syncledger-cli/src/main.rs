mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "syncledger",
    version,
    about = "Checkpoint-consistent record accounting for sync attempts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded message transcript through a tracker
    Replay {
        /// Path to a JSONL transcript
        transcript: PathBuf,
        /// Path to tracker config YAML (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Attempt number reported in the failure reason
        #[arg(long, default_value_t = 1)]
        attempt: u32,
        /// Write the committed checkpoint state to this file
        #[arg(long)]
        state_out: Option<PathBuf>,
    },
    /// Validate a tracker config and print the effective values
    Config {
        /// Path to tracker config YAML
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Replay {
            transcript,
            config,
            attempt,
            state_out,
        } => commands::replay::execute(
            &transcript,
            config.as_deref(),
            attempt,
            state_out.as_deref(),
        ),
        Commands::Config { config } => commands::config::execute(&config),
    }
}

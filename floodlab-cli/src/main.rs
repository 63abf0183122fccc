//! ## floodlab-cli
//! **Experiment entrypoint**
//!
//! Runs the flood-mitigation experiment against the simulated network
//! and writes the probe log and per-phase summary for post-processing.

use clap::Parser;
use floodlab_telemetry::logging::EventLogger;

mod commands;
mod sink;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    EventLogger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(run_args) => commands::run_experiment(run_args).await,
        Commands::Phase(phase_args) => commands::run_single_phase(phase_args).await,
    }
}

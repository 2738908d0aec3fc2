//! firesense - Main Entry Point
//!
//! Wildfire detection CLI: train, explain, predict.

use clap::Parser;
use firesense::cli::{cmd_explain, cmd_info, cmd_interactive, cmd_predict, cmd_train, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "firesense=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Train { data, artifacts, top_k, epochs, seed }) => {
            cmd_train(data, artifacts, top_k, epochs, seed)?;
        }
        Some(Commands::Explain { data, artifacts, samples }) => {
            cmd_explain(data, artifacts, samples)?;
        }
        Some(Commands::Predict { artifacts, values }) => {
            cmd_predict(artifacts, values)?;
        }
        Some(Commands::Info { data, artifacts }) => {
            cmd_info(data, artifacts)?;
        }
        None => {
            cmd_interactive()?;
        }
    }

    Ok(())
}

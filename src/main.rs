//! Chorus CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;

use chorus::cli::commands::{agent, kv, project, task, workflow, AppContext};
use chorus::cli::{Cli, Commands};
use chorus::infrastructure::config::ConfigLoader;
use chorus::infrastructure::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load().context("Failed to load configuration")?,
    };

    let _log_guard = init_tracing(&config.logging)?;

    let ctx = AppContext::from_config(config)
        .await
        .context("Failed to initialize services")?;

    match cli.command {
        Commands::Project(args) => project::handle(&ctx, args, cli.json).await,
        Commands::Task(args) => task::handle(&ctx, args, cli.json).await,
        Commands::Workflow(args) => workflow::handle(&ctx, args, cli.json).await,
        Commands::Agent(args) => agent::handle(&ctx, args, cli.json).await,
        Commands::Kv(args) => kv::handle(&ctx, args, cli.json).await,
    }
}

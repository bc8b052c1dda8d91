//! Chorus CLI definitions.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use commands::{
    agent::AgentArgs, kv::KvArgs, project::ProjectArgs, task::TaskArgs, workflow::WorkflowArgs,
};

/// Multi-agent coordination kernel.
#[derive(Parser, Debug)]
#[command(name = "chorus", version, about)]
pub struct Cli {
    /// Emit machine-readable JSON instead of tables.
    #[arg(long, global = true)]
    pub json: bool,

    /// Load configuration from an explicit file instead of `.chorus/`.
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// SPARC project operations.
    Project(ProjectArgs),
    /// Task routing and execution.
    Task(TaskArgs),
    /// Workflow control.
    Workflow(WorkflowArgs),
    /// Agent registry control.
    Agent(AgentArgs),
    /// Key-value store operations.
    Kv(KvArgs),
}

//! Workflow CLI commands.

use std::collections::HashMap;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::Value;
use uuid::Uuid;

use crate::cli::commands::AppContext;
use crate::cli::output::{self, print_json, truncate};
use crate::domain::models::WorkflowDefinition;
use crate::services::workflow_engine::WorkflowSource;

#[derive(Args, Debug)]
pub struct WorkflowArgs {
    #[command(subcommand)]
    pub command: WorkflowCommands,
}

#[derive(Subcommand, Debug)]
pub enum WorkflowCommands {
    /// Start a workflow from a registered name or a definition file
    Start {
        /// Registered definition name
        #[arg(short, long, conflicts_with = "file")]
        name: Option<String>,
        /// Definition file (YAML or JSON)
        #[arg(short, long)]
        file: Option<String>,
        /// Initial context as a JSON object
        #[arg(long, default_value = "{}")]
        context: String,
        /// Wait until the workflow settles (completes, fails, or pauses)
        #[arg(long)]
        wait: bool,
    },
    /// Cancel a workflow
    Cancel {
        /// Workflow ID
        id: String,
    },
    /// Resolve a gate the workflow is paused on
    Resume {
        /// Workflow ID
        id: String,
        /// Gate ID
        gate: String,
        /// Reject instead of approving
        #[arg(long)]
        reject: bool,
    },
    /// Show workflow status
    Status {
        /// Workflow ID
        id: String,
    },
    /// List workflows
    List,
    /// List registered definitions
    Definitions,
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).map_err(|_| anyhow::anyhow!("'{id}' is not a valid workflow id"))
}

pub async fn handle(ctx: &AppContext, args: WorkflowArgs, json: bool) -> Result<()> {
    match args.command {
        WorkflowCommands::Start {
            name,
            file,
            context,
            wait,
        } => {
            let context: HashMap<String, Value> =
                serde_json::from_str(&context).context("context must be a JSON object")?;

            let source = match (name, file) {
                (Some(name), _) => WorkflowSource::Name(name),
                (None, Some(path)) => {
                    let raw = std::fs::read_to_string(&path)
                        .with_context(|| format!("cannot read {path}"))?;
                    let definition: WorkflowDefinition = if path.ends_with(".json") {
                        serde_json::from_str(&raw)?
                    } else {
                        serde_yaml::from_str(&raw)?
                    };
                    WorkflowSource::Definition(definition)
                }
                (None, None) => anyhow::bail!("provide --name or --file"),
            };

            let id = ctx.workflows.start_workflow(source, context).await?;
            if wait {
                let settled = ctx
                    .workflows
                    .wait_for_settled(id)
                    .await
                    .ok_or_else(|| anyhow::anyhow!("workflow disappeared"))?;
                if json {
                    print_json(&settled)?;
                } else {
                    output::success(&format!("workflow {id} settled: {}", settled.status));
                    if let Some(gate) = &settled.paused_for_gate {
                        output::note(&format!(
                            "paused on gate {} at step {}",
                            gate.gate_id, gate.step_index
                        ));
                    }
                }
            } else if json {
                print_json(&serde_json::json!({ "workflow_id": id }))?;
            } else {
                output::success(&format!("started workflow {id}"));
            }
        }
        WorkflowCommands::Cancel { id } => {
            let id = parse_id(&id)?;
            let cancelled = ctx.workflows.cancel_workflow(id).await;
            if json {
                print_json(&serde_json::json!({ "cancelled": cancelled }))?;
            } else if cancelled {
                output::success("cancelled");
            } else {
                output::failure("not cancelled (unknown or already terminal)");
            }
        }
        WorkflowCommands::Resume { id, gate, reject } => {
            let id = parse_id(&id)?;
            ctx.workflows
                .resume_after_gate(id, &gate, !reject)
                .await?;
            if json {
                print_json(&serde_json::json!({ "workflow_id": id, "approved": !reject }))?;
            } else if reject {
                output::success("gate rejected; workflow failed");
            } else {
                output::success("gate approved; workflow resuming");
            }
        }
        WorkflowCommands::Status { id } => {
            let id = parse_id(&id)?;
            let workflow = ctx
                .workflows
                .get_workflow(id)
                .await
                .ok_or_else(|| anyhow::anyhow!("workflow {id} not found"))?;
            if json {
                print_json(&workflow)?;
            } else {
                println!("{} ({})", workflow.id, workflow.definition.name);
                println!("  status:  {}", workflow.status);
                println!(
                    "  step:    {}/{}",
                    workflow.current_step,
                    workflow.definition.steps.len()
                );
                if let Some(gate) = &workflow.paused_for_gate {
                    println!("  gate:    {} (step {})", gate.gate_id, gate.step_index);
                }
                if let Some(error) = &workflow.error {
                    println!("  error:   {error}");
                }
            }
        }
        WorkflowCommands::List => {
            let workflows = ctx.workflows.list_workflows().await;
            if json {
                print_json(&workflows)?;
            } else {
                let mut table = output::table(&["id", "name", "status", "step"]);
                for workflow in &workflows {
                    table.add_row(vec![
                        workflow.id.to_string(),
                        truncate(&workflow.definition.name, 30),
                        workflow.status.to_string(),
                        format!(
                            "{}/{}",
                            workflow.current_step,
                            workflow.definition.steps.len()
                        ),
                    ]);
                }
                println!("{table}");
            }
        }
        WorkflowCommands::Definitions => {
            let names = ctx.workflows.definition_names().await;
            if json {
                print_json(&names)?;
            } else if names.is_empty() {
                output::note("no definitions registered");
            } else {
                for name in names {
                    println!("{name}");
                }
            }
        }
    }
    Ok(())
}

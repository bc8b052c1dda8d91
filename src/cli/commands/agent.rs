//! Agent CLI commands.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use crate::cli::commands::AppContext;
use crate::cli::output::{self, print_json};
use crate::domain::models::{Agent, AgentStatus, AgentType};
use crate::services::agent_registry::AgentFilter;

#[derive(Args, Debug)]
pub struct AgentArgs {
    #[command(subcommand)]
    pub command: AgentCommands,
}

#[derive(Subcommand, Debug)]
pub enum AgentCommands {
    /// Register an agent
    Register {
        /// Agent ID
        id: String,
        /// Agent type (researcher, coder, analyst, tester, coordinator,
        /// architect, debugger, reviewer, optimizer, documenter)
        #[arg(short = 't', long, default_value = "coder")]
        agent_type: String,
        /// Capabilities (repeatable)
        #[arg(short, long)]
        capability: Vec<String>,
    },
    /// Remove an agent
    Remove {
        /// Agent ID
        id: String,
    },
    /// List agents
    List {
        /// Filter by status
        #[arg(short, long)]
        status: Option<String>,
        /// Filter by type
        #[arg(short = 't', long)]
        agent_type: Option<String>,
    },
    /// Return an errored agent to the idle pool
    Reset {
        /// Agent ID
        id: String,
    },
    /// Show swarm metrics
    Metrics,
}

pub async fn handle(ctx: &AppContext, args: AgentArgs, json: bool) -> Result<()> {
    match args.command {
        AgentCommands::Register {
            id,
            agent_type,
            capability,
        } => {
            let Some(agent_type) = AgentType::parse_str(&agent_type) else {
                bail!("unknown agent type '{agent_type}'");
            };
            let agent = Agent::new(&id, agent_type).with_capabilities(capability);
            ctx.swarm.register_agent(agent).await?;
            if json {
                print_json(&serde_json::json!({ "agent_id": id }))?;
            } else {
                output::success(&format!("registered {id}"));
            }
        }
        AgentCommands::Remove { id } => {
            let removed = ctx.swarm.remove_agent(&id).await?;
            if json {
                print_json(&serde_json::json!({ "removed": removed }))?;
            } else if removed {
                output::success(&format!("removed {id}"));
            } else {
                output::note(&format!("{id} was not registered"));
            }
        }
        AgentCommands::List { status, agent_type } => {
            let filter = AgentFilter {
                status: status.as_deref().and_then(AgentStatus::parse_str),
                agent_type: agent_type.as_deref().and_then(AgentType::parse_str),
                capability: None,
            };
            let agents = ctx.swarm.list_agents(&filter).await;
            if json {
                print_json(&agents)?;
            } else {
                let mut table =
                    output::table(&["id", "type", "status", "capabilities", "completed", "score"]);
                for agent in &agents {
                    table.add_row(vec![
                        agent.id.clone(),
                        agent.agent_type.as_str().to_string(),
                        agent.status.as_str().to_string(),
                        agent
                            .capabilities
                            .iter()
                            .cloned()
                            .collect::<Vec<_>>()
                            .join(","),
                        agent.performance.tasks_completed.to_string(),
                        format!("{:.2}", agent.performance.dispatch_score()),
                    ]);
                }
                println!("{table}");
            }
        }
        AgentCommands::Reset { id } => {
            let agent = ctx.swarm.reset_agent(&id).await?;
            if json {
                print_json(&agent)?;
            } else {
                output::success(&format!("{id} is {}", agent.status.as_str()));
            }
        }
        AgentCommands::Metrics => {
            let metrics = ctx.swarm.metrics().await;
            if json {
                print_json(&metrics)?;
            } else {
                println!("agents:        {} ({} active)", metrics.agent_count, metrics.active_agents);
                println!("tasks:         {} ({} completed)", metrics.total_tasks, metrics.completed_tasks);
                println!("avg response:  {:.1} ms", metrics.avg_response_ms);
                println!("throughput:    {:.2}/min", metrics.throughput_per_min);
                println!("error rate:    {:.1}%", metrics.error_rate * 100.0);
                println!("uptime:        {:.1} min", metrics.uptime_ms as f64 / 60_000.0);
            }
        }
    }
    Ok(())
}

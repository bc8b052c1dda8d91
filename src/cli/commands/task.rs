//! Task CLI commands.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use crate::cli::commands::AppContext;
use crate::cli::output::{self, print_json, truncate};
use crate::domain::models::{Priority, ProjectDomain};
use crate::services::task_coordinator::CoordinatedTask;

#[derive(Args, Debug)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommands,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Route and execute a task (direct dispatch or the structured pipeline)
    Run {
        /// Task ID
        id: String,
        /// What the task should accomplish
        description: String,
        /// Priority (low, medium, high, critical, or 1-10)
        #[arg(short, long, default_value = "medium")]
        priority: String,
        /// Required capabilities (repeatable)
        #[arg(short, long)]
        requirement: Vec<String>,
        /// Dependency task ids (repeatable)
        #[arg(long)]
        depends_on: Vec<String>,
        /// Requested sub-agent specialization
        #[arg(short, long)]
        subagent: Option<String>,
        /// Force the structured pipeline
        #[arg(long)]
        sparc: bool,
        /// Domain used when routing through the pipeline
        #[arg(short, long, default_value = "general")]
        domain: String,
        /// Per-task deadline in minutes
        #[arg(long)]
        timeout_minutes: Option<u64>,
    },
    /// Show the task history
    History,
    /// Show coordinator metrics
    Metrics,
}

pub async fn handle(ctx: &AppContext, args: TaskArgs, json: bool) -> Result<()> {
    match args.command {
        TaskCommands::Run {
            id,
            description,
            priority,
            requirement,
            depends_on,
            subagent,
            sparc,
            domain,
            timeout_minutes,
        } => {
            let Some(priority) = Priority::parse_str(&priority) else {
                bail!("unknown priority '{priority}'");
            };
            let Some(domain) = ProjectDomain::parse_str(&domain) else {
                bail!("unknown domain '{domain}'");
            };

            let mut task = CoordinatedTask::new(id, description);
            task.priority = priority;
            task.requirements = requirement.into_iter().collect();
            task.dependencies = depends_on;
            task.subagent_type = subagent;
            task.use_sparc_methodology = sparc;
            task.domain = domain;
            task.timeout_minutes = timeout_minutes;

            let record = ctx.coordinator.execute(task).await;
            if json {
                print_json(&record)?;
            } else if record.success {
                output::success(&format!(
                    "{} via {} in {:.0} ms",
                    record.task_id,
                    record.methodology.as_str(),
                    record.execution_time_ms
                ));
                if let Some(agent) = &record.agent_used {
                    output::note(&format!("agent: {agent}"));
                }
            } else {
                output::failure(&format!(
                    "{} failed: {}",
                    record.task_id,
                    record.error.as_deref().unwrap_or("unknown error")
                ));
            }
        }
        TaskCommands::History => {
            let history = ctx.coordinator.history().await;
            if json {
                print_json(&history)?;
            } else {
                let mut table =
                    output::table(&["task", "methodology", "agent", "success", "ms"]);
                for record in &history {
                    table.add_row(vec![
                        truncate(&record.task_id, 24),
                        record.methodology.as_str().to_string(),
                        record.agent_used.clone().unwrap_or_else(|| "-".to_string()),
                        record.success.to_string(),
                        format!("{:.0}", record.execution_time_ms),
                    ]);
                }
                println!("{table}");
            }
        }
        TaskCommands::Metrics => {
            let metrics = ctx.coordinator.metrics().await;
            if json {
                print_json(&metrics)?;
            } else {
                println!("tasks:        {}", metrics.total_tasks);
                println!("success rate: {:.0}%", metrics.success_rate * 100.0);
                println!("avg success:  {:.0} ms", metrics.avg_execution_ms);
                let mut agents: Vec<(&String, &u64)> = metrics.agent_usage.iter().collect();
                agents.sort_by(|a, b| b.1.cmp(a.1));
                for (agent, count) in agents {
                    output::note(&format!("{agent}: {count}"));
                }
            }
        }
    }
    Ok(())
}

//! Project CLI commands.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use uuid::Uuid;

use crate::cli::commands::AppContext;
use crate::cli::output::{self, print_json, truncate};
use crate::domain::models::{
    Complexity, ProjectDomain, RefinementFeedback, SparcPhase,
};
use crate::services::sparc::CreateProject;

#[derive(Args, Debug)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectCommands,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a new SPARC project
    Create {
        /// Project name
        name: String,
        /// Domain (swarm-coordination, neural-networks, memory-systems,
        /// rest-api, wasm-integration, interfaces, general)
        #[arg(short, long, default_value = "general")]
        domain: String,
        /// Complexity (simple, moderate, high, complex, enterprise)
        #[arg(short, long, default_value = "moderate")]
        complexity: String,
        /// Requirements (repeatable)
        #[arg(short, long)]
        requirement: Vec<String>,
        /// Constraints (repeatable)
        #[arg(long)]
        constraint: Vec<String>,
        /// Description
        #[arg(long, default_value = "")]
        description: String,
        /// Also write the vision document, fire document workflows, and
        /// seed the SPARC swarm
        #[arg(long)]
        full_init: bool,
    },
    /// Execute a single phase
    Phase {
        /// Project ID
        id: String,
        /// Phase name
        phase: String,
    },
    /// Execute all remaining phases
    Run {
        /// Project ID
        id: String,
    },
    /// Show project status
    Status {
        /// Project ID
        id: String,
        /// Include per-phase details
        #[arg(long)]
        details: bool,
    },
    /// List projects
    List {
        /// Filter by domain
        #[arg(short, long)]
        domain: Option<String>,
        /// Filter by status (completed, in-progress)
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Validate production readiness
    Validate {
        /// Project ID
        id: String,
    },
    /// Run a refinement iteration from feedback
    Refine {
        /// Project ID
        id: String,
        /// Performance issues (repeatable)
        #[arg(long)]
        performance: Vec<String>,
        /// Security issues (repeatable)
        #[arg(long)]
        security: Vec<String>,
        /// Scalability issues (repeatable)
        #[arg(long)]
        scalability: Vec<String>,
        /// Code quality issues (repeatable)
        #[arg(long)]
        quality: Vec<String>,
    },
    /// Apply a domain template to a project
    Template {
        /// Project ID
        id: String,
        /// Template id (e.g. rest-api-service)
        template: String,
    },
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).map_err(|_| anyhow::anyhow!("'{id}' is not a valid project id"))
}

pub async fn handle(ctx: &AppContext, args: ProjectArgs, json: bool) -> Result<()> {
    match args.command {
        ProjectCommands::Create {
            name,
            domain,
            complexity,
            requirement,
            constraint,
            description,
            full_init,
        } => {
            let Some(domain) = ProjectDomain::parse_str(&domain) else {
                bail!("unknown domain '{domain}'");
            };
            let Some(complexity) = Complexity::parse_str(&complexity) else {
                bail!("unknown complexity '{complexity}'");
            };
            let request = CreateProject {
                name,
                domain,
                complexity,
                requirements: requirement,
                constraints: constraint,
                description,
            };

            if full_init {
                let init = ctx.projects.initialize_project(request).await?;
                if json {
                    print_json(&init)?;
                } else {
                    output::success(&format!("Created project {}", init.project.id));
                    output::note(&format!("vision: {}", init.vision_key));
                    output::note(&format!(
                        "document workflows started: {}",
                        init.workflow_ids.len()
                    ));
                    output::note(&format!("phase tasks: {}", init.phase_tasks.len()));
                }
            } else {
                let project = ctx.sparc.create_project(request).await?;
                if json {
                    print_json(&project)?;
                } else {
                    output::success(&format!("Created project {}", project.id));
                }
            }
        }
        ProjectCommands::Phase { id, phase } => {
            let id = parse_id(&id)?;
            let Some(phase) = SparcPhase::parse_str(&phase) else {
                bail!("unknown phase '{phase}'");
            };
            let result = ctx.projects.execute_phase(id, phase).await?;
            if json {
                print_json(&result)?;
            } else {
                output::success(&format!(
                    "{} completed: {} deliverables, quality {:.2}",
                    result.phase.as_str(),
                    result.deliverables.len(),
                    result.metrics.quality_score
                ));
                for recommendation in &result.recommendations {
                    output::note(recommendation);
                }
            }
        }
        ProjectCommands::Run { id } => {
            let id = parse_id(&id)?;
            let remaining: Vec<SparcPhase> = {
                let project = ctx
                    .sparc
                    .get_project(id)
                    .await
                    .ok_or_else(|| anyhow::anyhow!("project {id} not found"))?;
                SparcPhase::CANONICAL_ORDER
                    .into_iter()
                    .filter(|p| !project.progress.completed_phases.contains(p))
                    .collect()
            };

            let bar = if json {
                ProgressBar::hidden()
            } else {
                let bar = ProgressBar::new(remaining.len() as u64);
                bar.set_style(
                    ProgressStyle::with_template("{spinner} {msg} [{bar:30}] {pos}/{len}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
                bar
            };

            let mut results = Vec::new();
            for phase in remaining {
                bar.set_message(phase.as_str().to_string());
                results.push(ctx.projects.execute_phase(id, phase).await?);
                bar.inc(1);
            }
            bar.finish_and_clear();

            if json {
                print_json(&results)?;
            } else {
                output::success(&format!("Executed {} phases", results.len()));
            }
        }
        ProjectCommands::Status { id, details } => {
            let id = parse_id(&id)?;
            let project = ctx
                .sparc
                .get_project(id)
                .await
                .ok_or_else(|| anyhow::anyhow!("project {id} not found"))?;
            if json {
                print_json(&project)?;
            } else {
                println!("{} ({})", project.name, project.domain.as_str());
                println!("  phase:    {}", project.current_phase.as_str());
                println!(
                    "  progress: {:.0}% ({} of 5 phases)",
                    project.progress.overall_progress * 100.0,
                    project.progress.completed_phases.len()
                );
                if details {
                    let mut table = output::table(&["phase", "status", "deliverables"]);
                    for phase in SparcPhase::CANONICAL_ORDER {
                        let state = project.progress.phase_status.get(&phase);
                        table.add_row(vec![
                            phase.as_str().to_string(),
                            state
                                .map(|s| format!("{:?}", s.status))
                                .unwrap_or_else(|| "not started".to_string()),
                            state
                                .map(|s| s.deliverables.len().to_string())
                                .unwrap_or_else(|| "0".to_string()),
                        ]);
                    }
                    println!("{table}");
                }
            }
        }
        ProjectCommands::List { domain, status } => {
            let domain = domain.as_deref().and_then(ProjectDomain::parse_str);
            let projects = ctx.sparc.list_projects(domain, status.as_deref()).await;
            if json {
                print_json(&projects)?;
            } else {
                let mut table = output::table(&["id", "name", "domain", "phase", "progress"]);
                for project in &projects {
                    table.add_row(vec![
                        project.id.to_string(),
                        truncate(&project.name, 30),
                        project.domain.as_str().to_string(),
                        project.current_phase.as_str().to_string(),
                        format!("{:.0}%", project.progress.overall_progress * 100.0),
                    ]);
                }
                println!("{table}");
            }
        }
        ProjectCommands::Validate { id } => {
            let id = parse_id(&id)?;
            let report = ctx.sparc.validate_completion(id).await?;
            if json {
                print_json(&report)?;
            } else if report.ready_for_production {
                output::success("ready for production");
            } else {
                output::failure("not ready for production");
                for check in report.checks.iter().filter(|c| !c.passed) {
                    output::note(&format!("{}: {}", check.criterion, check.details));
                }
            }
        }
        ProjectCommands::Refine {
            id,
            performance,
            security,
            scalability,
            quality,
        } => {
            let id = parse_id(&id)?;
            let feedback = RefinementFeedback {
                performance_issues: performance,
                security_issues: security,
                scalability_issues: scalability,
                code_quality_issues: quality,
            };
            let result = ctx.sparc.refine_implementation(id, feedback).await?;
            if json {
                print_json(&result)?;
            } else {
                output::success(&format!(
                    "refinement recorded ({} deliverables)",
                    result.deliverables.len()
                ));
            }
        }
        ProjectCommands::Template { id, template } => {
            let id = parse_id(&id)?;
            let report = ctx.sparc.apply_template(id, &template).await?;
            if json {
                print_json(&report)?;
            } else {
                output::success(&format!("applied template {}", report.template_id));
                for customization in &report.customizations {
                    output::note(customization);
                }
            }
        }
    }
    Ok(())
}

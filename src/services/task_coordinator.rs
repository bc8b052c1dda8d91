//! Task coordinator.
//!
//! Decides, per logical task, between direct execution (one agent assigned
//! through the swarm coordinator) and the structured five-phase pipeline,
//! then records the outcome. Errors never escape: every path produces a
//! structured task record.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tokio::time::{timeout, Duration};
use tracing::{info, instrument, warn};

use crate::domain::errors::DomainError;
use crate::domain::models::{
    Complexity, CoordinatorSettings, Document, Priority, ProjectDomain, TaskSpec,
};
use crate::domain::ports::{AgentRuntime, ExecutionContext};
use crate::services::sparc::{CreateProject, SparcEngine};
use crate::services::swarm_coordinator::SwarmCoordinator;

/// Sub-agent specializations considered inherently optimal.
const SPECIALIZED_SUBAGENTS: [&str; 6] = [
    "code-review-swarm",
    "debug",
    "ai-ml-specialist",
    "database-architect",
    "system-architect",
    "security-analyzer",
];

/// Methodology a task was executed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Methodology {
    Direct,
    Sparc,
}

impl Methodology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Sparc => "sparc",
        }
    }
}

/// A logical task submitted to the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatedTask {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub requirements: BTreeSet<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Requested sub-agent specialization (e.g. "coder", "debug").
    #[serde(default)]
    pub subagent_type: Option<String>,
    /// Force the structured pipeline.
    #[serde(default)]
    pub use_sparc_methodology: bool,
    /// Originating document, when the task was derived from one.
    #[serde(default)]
    pub source_document: Option<Document>,
    /// Per-task deadline in minutes; coordinator default when absent.
    #[serde(default)]
    pub timeout_minutes: Option<u64>,
    /// Domain used when the task routes through the pipeline.
    #[serde(default)]
    pub domain: ProjectDomain,
}

impl CoordinatedTask {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            priority: Priority::default(),
            requirements: BTreeSet::new(),
            dependencies: Vec::new(),
            subagent_type: None,
            use_sparc_methodology: false,
            source_document: None,
            timeout_minutes: None,
            domain: ProjectDomain::General,
        }
    }
}

/// Outcome record for one coordinated task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub success: bool,
    pub output: Value,
    pub agent_used: Option<String>,
    pub execution_time_ms: f64,
    pub tools_used: Vec<String>,
    pub methodology: Methodology,
    pub error: Option<String>,
    pub finished_at: DateTime<Utc>,
}

/// Aggregates over the full task history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorMetrics {
    pub total_tasks: usize,
    pub success_rate: f64,
    /// Mean execution time of successful tasks.
    pub avg_execution_ms: f64,
    pub agent_usage: HashMap<String, u64>,
    pub tool_usage: HashMap<String, u64>,
}

/// The task coordinator.
pub struct TaskCoordinator {
    settings: CoordinatorSettings,
    swarm: Arc<SwarmCoordinator>,
    sparc: Arc<SparcEngine>,
    runtime: Arc<dyn AgentRuntime>,
    history: RwLock<Vec<TaskRecord>>,
}

impl TaskCoordinator {
    pub fn new(
        settings: CoordinatorSettings,
        swarm: Arc<SwarmCoordinator>,
        sparc: Arc<SparcEngine>,
        runtime: Arc<dyn AgentRuntime>,
    ) -> Self {
        Self {
            settings,
            swarm,
            sparc,
            runtime,
            history: RwLock::new(Vec::new()),
        }
    }

    // ========================================================================
    // Routing
    // ========================================================================

    /// Whether the task routes through the structured pipeline.
    pub fn should_use_sparc(&self, task: &CoordinatedTask) -> bool {
        if task.use_sparc_methodology {
            return true;
        }
        if task.priority.is_elevated() {
            return true;
        }
        if task.description.len() > self.settings.sparc_description_threshold {
            return true;
        }
        task.source_document.as_ref().is_some_and(Document::is_complex)
    }

    /// Map a requested sub-agent type to its canonical alias. The table is
    /// closed; unknown types pass through unchanged.
    pub fn canonical_subagent(requested: &str) -> String {
        match requested.to_lowercase().as_str() {
            "code-review" | "reviewer" => "code-review-swarm".to_string(),
            "debug" | "debugger" => "debug".to_string(),
            "ml" | "ai-ml" => "ai-ml-specialist".to_string(),
            "database" => "database-architect".to_string(),
            "architect" | "architecture" => "system-architect".to_string(),
            "security" => "security-analyzer".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether the specialized sub-agent variant is worth selecting.
    pub fn specialization_optimal(task: &CoordinatedTask, canonical: &str) -> bool {
        task.priority.is_elevated()
            || task.dependencies.len() > 2
            || SPECIALIZED_SUBAGENTS.contains(&canonical)
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Execute a task under the routed methodology. Never fails; failures
    /// are recorded in the returned task record.
    #[instrument(skip(self, task), fields(task_id = %task.id))]
    pub async fn execute(&self, task: CoordinatedTask) -> TaskRecord {
        let record = if self.should_use_sparc(&task) {
            self.execute_sparc(&task).await
        } else {
            self.execute_direct(&task).await
        };
        self.history.write().await.push(record.clone());
        record
    }

    async fn execute_direct(&self, task: &CoordinatedTask) -> TaskRecord {
        let started = std::time::Instant::now();
        let finish = |success, output, agent_used, tools_used, error| TaskRecord {
            task_id: task.id.clone(),
            success,
            output,
            agent_used,
            execution_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            tools_used,
            methodology: Methodology::Direct,
            error,
            finished_at: Utc::now(),
        };

        // Select the agent through the dispatcher.
        let spec = TaskSpec::new(&task.id, &task.description)
            .with_priority(task.priority)
            .with_requirements(task.requirements.iter().cloned());
        let assigned = match self.swarm.assign(&spec).await {
            Ok(Some(agent_id)) => agent_id,
            Ok(None) => {
                return finish(
                    false,
                    Value::Null,
                    None,
                    Vec::new(),
                    Some("no suitable agent available".to_string()),
                );
            }
            Err(e) => {
                return finish(false, Value::Null, None, Vec::new(), Some(e.to_string()));
            }
        };

        let requested = task.subagent_type.as_deref().unwrap_or("coder");
        let canonical = Self::canonical_subagent(requested);
        let subagent = if Self::specialization_optimal(task, &canonical) {
            canonical
        } else {
            requested.to_string()
        };

        let context = ExecutionContext {
            prompt: task.description.clone(),
            domain_context: task
                .source_document
                .as_ref()
                .map(|d| format!("{}: {}", d.kind.as_str(), d.title))
                .unwrap_or_default(),
            expected_output: "structured result record".to_string(),
            system_prompt: system_prompt_for(&subagent),
            agent_id: assigned.clone(),
            subagent_type: subagent,
        };

        let deadline_min = task
            .timeout_minutes
            .unwrap_or(self.settings.default_timeout_minutes);
        let deadline = Duration::from_secs(deadline_min * 60);

        match timeout(deadline, self.runtime.execute(&context)).await {
            Err(_) => {
                let message = DomainError::Timeout(deadline.as_millis() as u64).to_string();
                warn!(agent_id = assigned, "Task deadline expired");
                if let Err(e) = self
                    .swarm
                    .dispatcher()
                    .complete_with_error(&task.id, &message)
                    .await
                {
                    warn!(error = %e, "Failed to release timed-out assignment");
                }
                finish(false, Value::Null, Some(assigned), Vec::new(), Some(message))
            }
            Ok(Err(e)) => {
                let message = e.to_string();
                if let Err(e) = self
                    .swarm
                    .dispatcher()
                    .complete_with_error(&task.id, &message)
                    .await
                {
                    warn!(error = %e, "Failed to release failed assignment");
                }
                finish(false, Value::Null, Some(assigned), Vec::new(), Some(message))
            }
            Ok(Ok(output)) => {
                if let Err(e) = self.swarm.complete(&task.id, output.output.clone()).await {
                    warn!(error = %e, "Failed to complete assignment");
                }
                info!(agent_id = assigned, "Direct task completed");
                finish(true, output.output, Some(assigned), output.tools_used, None)
            }
        }
    }

    async fn execute_sparc(&self, task: &CoordinatedTask) -> TaskRecord {
        let started = std::time::Instant::now();
        let finish = |success, output, error| TaskRecord {
            task_id: task.id.clone(),
            success,
            output,
            agent_used: Some("sparc-pipeline".to_string()),
            execution_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            tools_used: vec!["sparc".to_string()],
            methodology: Methodology::Sparc,
            error,
            finished_at: Utc::now(),
        };

        let request = CreateProject {
            name: task.id.clone(),
            domain: task.domain,
            complexity: if task.priority >= Priority::CRITICAL {
                Complexity::Complex
            } else {
                Complexity::Moderate
            },
            requirements: task.requirements.iter().cloned().collect(),
            constraints: Vec::new(),
            description: task.description.clone(),
        };

        let project = match self.sparc.create_project(request).await {
            Ok(project) => project,
            Err(e) => return finish(false, Value::Null, Some(e.to_string())),
        };

        match self.sparc.execute_full(project.id).await {
            Err(e) => finish(false, json!({"project_id": project.id}), Some(e.to_string())),
            Ok(results) => {
                // Artifacts grouped by phase.
                let mut by_phase: HashMap<&'static str, Vec<String>> = HashMap::new();
                for result in &results {
                    by_phase
                        .entry(result.phase.as_str())
                        .or_default()
                        .extend(result.deliverables.iter().map(|d| d.name.clone()));
                }
                let output = json!({
                    "project_id": project.id,
                    "phases_completed": results.len(),
                    "artifacts": by_phase,
                });
                finish(true, output, None)
            }
        }
    }

    // ========================================================================
    // History and metrics
    // ========================================================================

    /// Full task history, oldest first.
    pub async fn history(&self) -> Vec<TaskRecord> {
        self.history.read().await.clone()
    }

    /// Aggregates computed over the full history.
    pub async fn metrics(&self) -> CoordinatorMetrics {
        let history = self.history.read().await;
        let total_tasks = history.len();
        if total_tasks == 0 {
            return CoordinatorMetrics::default();
        }

        let successes: Vec<&TaskRecord> = history.iter().filter(|r| r.success).collect();
        let success_rate = successes.len() as f64 / total_tasks as f64;
        let avg_execution_ms = if successes.is_empty() {
            0.0
        } else {
            successes.iter().map(|r| r.execution_time_ms).sum::<f64>() / successes.len() as f64
        };

        let mut agent_usage: HashMap<String, u64> = HashMap::new();
        let mut tool_usage: HashMap<String, u64> = HashMap::new();
        for record in history.iter() {
            if let Some(agent) = &record.agent_used {
                *agent_usage.entry(agent.clone()).or_default() += 1;
            }
            for tool in &record.tools_used {
                *tool_usage.entry(tool.clone()).or_default() += 1;
            }
        }

        CoordinatorMetrics {
            total_tasks,
            success_rate,
            avg_execution_ms,
            agent_usage,
            tool_usage,
        }
    }
}

/// System prompt for a sub-agent specialization.
fn system_prompt_for(subagent: &str) -> String {
    let focus = match subagent {
        "code-review-swarm" => "Review the change set for defects, style, and risk.",
        "debug" => "Reproduce the failure, isolate the fault, and propose a fix.",
        "ai-ml-specialist" => "Design and evaluate the learning components.",
        "database-architect" => "Design the schema, indexes, and access paths.",
        "system-architect" => "Shape components, interfaces, and deployment.",
        "security-analyzer" => "Find exposures and verify mitigations.",
        "researcher" => "Gather and synthesize relevant information.",
        "tester" => "Exercise the behavior and report divergences.",
        _ => "Complete the assigned work and report a structured result.",
    };
    format!("You are the {subagent} specialist. {focus}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::InMemoryKvStore;
    use crate::domain::models::{
        Agent, AgentType, DocumentKind, SparcPhase, SparcSettings, SwarmConfig,
    };
    use crate::domain::ports::NullAgentRuntime;
    use crate::services::event_bus::EventBus;
    use crate::services::template_registry::TemplateRegistry;

    fn coordinator() -> TaskCoordinator {
        let bus = Arc::new(EventBus::default());
        let swarm = Arc::new(SwarmCoordinator::new(SwarmConfig::default(), bus.clone()));
        let sparc = Arc::new(SparcEngine::new(
            SparcSettings::default(),
            Arc::new(TemplateRegistry::with_builtins()),
            Arc::new(InMemoryKvStore::new()),
            bus,
        ));
        TaskCoordinator::new(
            CoordinatorSettings::default(),
            swarm,
            sparc,
            Arc::new(NullAgentRuntime),
        )
    }

    #[test]
    fn test_routing_rules() {
        let coordinator = coordinator();

        let plain = CoordinatedTask::new("t1", "small fix");
        assert!(!coordinator.should_use_sparc(&plain));

        let mut forced = CoordinatedTask::new("t2", "small fix");
        forced.use_sparc_methodology = true;
        assert!(coordinator.should_use_sparc(&forced));

        let mut critical = CoordinatedTask::new("t3", "small fix");
        critical.priority = Priority::CRITICAL;
        assert!(coordinator.should_use_sparc(&critical));

        let long = CoordinatedTask::new("t4", "x".repeat(201));
        assert!(coordinator.should_use_sparc(&long));

        let mut documented = CoordinatedTask::new("t5", "small fix");
        documented.source_document = Some(
            Document::new(DocumentKind::Prd, "Complex PRD", "")
                .with_metadata("tags", json!(["architecture"])),
        );
        assert!(coordinator.should_use_sparc(&documented));
    }

    #[test]
    fn test_subagent_aliases() {
        assert_eq!(
            TaskCoordinator::canonical_subagent("code-review"),
            "code-review-swarm"
        );
        assert_eq!(TaskCoordinator::canonical_subagent("debugger"), "debug");
        assert_eq!(
            TaskCoordinator::canonical_subagent("architecture"),
            "system-architect"
        );
        assert_eq!(
            TaskCoordinator::canonical_subagent("security"),
            "security-analyzer"
        );
        // Unknown types pass through.
        assert_eq!(TaskCoordinator::canonical_subagent("coder"), "coder");
    }

    #[test]
    fn test_specialization_heuristic() {
        let mut task = CoordinatedTask::new("t1", "work");
        assert!(!TaskCoordinator::specialization_optimal(&task, "coder"));
        assert!(TaskCoordinator::specialization_optimal(&task, "debug"));

        task.priority = Priority::HIGH;
        assert!(TaskCoordinator::specialization_optimal(&task, "coder"));

        task.priority = Priority::LOW;
        task.dependencies = vec!["a".into(), "b".into(), "c".into()];
        assert!(TaskCoordinator::specialization_optimal(&task, "coder"));
    }

    #[tokio::test]
    async fn test_direct_execution_records_success() {
        let coordinator = coordinator();
        coordinator
            .swarm
            .register_agent(Agent::new("a1", AgentType::Coder).with_capability("web"))
            .await
            .unwrap();

        let mut task = CoordinatedTask::new("t1", "fetch the page");
        task.requirements.insert("web".to_string());
        let record = coordinator.execute(task).await;

        assert!(record.success);
        assert_eq!(record.methodology, Methodology::Direct);
        assert_eq!(record.agent_used.as_deref(), Some("a1"));

        let metrics = coordinator.metrics().await;
        assert_eq!(metrics.total_tasks, 1);
        assert!((metrics.success_rate - 1.0).abs() < f64::EPSILON);
        assert_eq!(metrics.agent_usage["a1"], 1);
    }

    #[tokio::test]
    async fn test_direct_execution_without_agents_fails() {
        let coordinator = coordinator();
        let record = coordinator
            .execute(CoordinatedTask::new("t1", "nothing can do this"))
            .await;
        assert!(!record.success);
        assert!(record.error.unwrap().contains("no suitable agent"));
    }

    #[tokio::test]
    async fn test_sparc_execution_groups_artifacts_by_phase() {
        let coordinator = coordinator();
        let mut task = CoordinatedTask::new("big-build", "build the service");
        task.use_sparc_methodology = true;
        task.domain = ProjectDomain::RestApi;
        task.requirements.insert("CRUD users".to_string());

        let record = coordinator.execute(task).await;
        assert!(record.success);
        assert_eq!(record.methodology, Methodology::Sparc);
        assert_eq!(record.output["phases_completed"], json!(5));
        for phase in SparcPhase::CANONICAL_ORDER {
            assert!(record.output["artifacts"][phase.as_str()].is_array());
        }
    }

    #[tokio::test]
    async fn test_metrics_over_mixed_history() {
        let coordinator = coordinator();
        coordinator
            .swarm
            .register_agent(Agent::new("a1", AgentType::Coder))
            .await
            .unwrap();

        coordinator
            .execute(CoordinatedTask::new("ok", "quick task"))
            .await;
        let mut missing = CoordinatedTask::new("missing", "needs ml");
        missing.requirements.insert("ml".to_string());
        coordinator.execute(missing).await;

        let metrics = coordinator.metrics().await;
        assert_eq!(metrics.total_tasks, 2);
        assert!((metrics.success_rate - 0.5).abs() < f64::EPSILON);
    }
}

//! Project coordinator.
//!
//! Wires the SPARC engine into documents, document workflows, and phase
//! tasks: project initialization produces a vision document, fires the four
//! document workflows, and seeds the SPARC swarm; architecture completion
//! derives ADR documents; every phase gets a coordination task with the
//! phase-appropriate agent type.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Agent, AgentType, Document, DocumentKind, SparcPhase, SparcProject, StepDefinition,
    WorkflowDefinition,
};
use crate::domain::ports::KvStore;
use crate::services::sparc::{CreateProject, PhaseResult, SparcEngine};
use crate::services::swarm_coordinator::SwarmCoordinator;
use crate::services::workflow_engine::WorkflowEngine;

/// KV namespace documents are written to.
pub const DOCUMENTS_NAMESPACE: &str = "documents";
/// KV namespace phase tasks are written to.
pub const TASKS_NAMESPACE: &str = "tasks";

/// The document workflows fired on project initialization, in order.
pub const DOCUMENT_WORKFLOWS: [&str; 4] = [
    "vision-to-prds",
    "prd-to-epics",
    "epic-to-features",
    "feature-to-tasks",
];

/// Optimal agent type per phase.
pub fn optimal_agent_for(phase: SparcPhase) -> &'static str {
    match phase {
        SparcPhase::Specification => "system-analyst",
        SparcPhase::Pseudocode => "algorithm-designer",
        SparcPhase::Architecture => "system-architect",
        SparcPhase::Refinement => "performance-optimizer",
        SparcPhase::Completion => "full-stack-developer",
    }
}

/// Estimated effort per phase, in minutes.
fn estimated_effort(phase: SparcPhase) -> u32 {
    match phase {
        SparcPhase::Specification => 120,
        SparcPhase::Pseudocode => 90,
        SparcPhase::Architecture => 150,
        SparcPhase::Refinement => 120,
        SparcPhase::Completion => 180,
    }
}

/// A coordination task generated for one phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTask {
    pub id: String,
    pub project_id: Uuid,
    pub phase: SparcPhase,
    pub title: String,
    pub agent_type: String,
    pub estimated_effort_min: u32,
    /// The prior phase's task, when one exists.
    pub depends_on: Option<String>,
}

/// Product of project initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInit {
    pub project: SparcProject,
    pub vision_key: String,
    pub workflow_ids: Vec<Uuid>,
    pub phase_tasks: Vec<PhaseTask>,
}

/// The project coordinator.
pub struct ProjectCoordinator {
    sparc: Arc<SparcEngine>,
    workflows: Arc<WorkflowEngine>,
    swarm: Arc<SwarmCoordinator>,
    kv: Arc<dyn KvStore>,
}

impl ProjectCoordinator {
    pub fn new(
        sparc: Arc<SparcEngine>,
        workflows: Arc<WorkflowEngine>,
        swarm: Arc<SwarmCoordinator>,
        kv: Arc<dyn KvStore>,
    ) -> Self {
        Self {
            sparc,
            workflows,
            swarm,
            kv,
        }
    }

    // ========================================================================
    // Initialization
    // ========================================================================

    /// Create a project, write its vision document, fire the document
    /// workflows, seed the SPARC swarm, and generate phase tasks.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn initialize_project(&self, request: CreateProject) -> DomainResult<ProjectInit> {
        let project = self.sparc.create_project(request).await?;

        // Vision document.
        let vision = Document::new(
            DocumentKind::Vision,
            format!("{} Vision", project.name),
            vision_markdown(&project),
        );
        let vision_key = vision.storage_key();
        let receipt = self
            .kv
            .store(
                &vision_key,
                serde_json::to_value(&vision)?,
                DOCUMENTS_NAMESPACE,
            )
            .await;
        if !receipt.is_success() {
            return Err(DomainError::Backend(
                receipt.error.unwrap_or_else(|| "vision store failed".to_string()),
            ));
        }

        // Document workflows, registered once and fired per project.
        self.ensure_document_workflows().await?;
        let mut workflow_ids = Vec::with_capacity(DOCUMENT_WORKFLOWS.len());
        for name in DOCUMENT_WORKFLOWS {
            let mut context = HashMap::new();
            context.insert("project_id".to_string(), json!(project.id));
            context.insert("source_document".to_string(), json!(&vision_key));
            context.insert("stage".to_string(), json!(name));
            match self.workflows.start_workflow(name, context).await {
                Ok(id) => workflow_ids.push(id),
                Err(e) => warn!(workflow = name, error = %e, "Document workflow did not start"),
            }
        }

        self.seed_sparc_swarm().await;
        let phase_tasks = self.generate_phase_tasks(&project).await;

        info!(project_id = %project.id, workflows = workflow_ids.len(), "Initialized project");
        Ok(ProjectInit {
            project,
            vision_key,
            workflow_ids,
            phase_tasks,
        })
    }

    /// Register the four document workflow definitions when missing.
    async fn ensure_document_workflows(&self) -> DomainResult<()> {
        let registered = self.workflows.definition_names().await;
        for name in DOCUMENT_WORKFLOWS {
            if registered.iter().any(|n| n == name) {
                continue;
            }
            let definition = WorkflowDefinition::new(name)
                .with_description(format!("Document pipeline stage: {name}"))
                .with_step(
                    StepDefinition::new("log")
                        .with_name("announce")
                        .with_params(json!({"message": format!("running {name}")})),
                )
                .with_step(
                    StepDefinition::new("transform")
                        .with_name("stamp-stage")
                        .with_params(json!({
                            "path": "stage",
                            "operation": "uppercase",
                        })),
                );
            self.workflows.register_definition(definition).await?;
        }
        Ok(())
    }

    /// Register one default agent per phase specialization. Existing agents
    /// are left alone.
    async fn seed_sparc_swarm(&self) {
        for phase in SparcPhase::CANONICAL_ORDER {
            let agent_type = optimal_agent_for(phase);
            let agent = Agent::new(format!("sparc-{agent_type}"), agent_type_of(phase))
                .with_capability(agent_type)
                .with_capability(phase.as_str());
            match self.swarm.register_agent(agent).await {
                Ok(()) => {}
                Err(DomainError::AgentAlreadyExists(_)) => {}
                Err(e) => warn!(error = %e, "SPARC swarm seeding failed"),
            }
        }
    }

    /// One coordination task per phase, each depending on the prior one.
    async fn generate_phase_tasks(&self, project: &SparcProject) -> Vec<PhaseTask> {
        let mut tasks = Vec::with_capacity(SparcPhase::CANONICAL_ORDER.len());
        let mut prior: Option<String> = None;
        for phase in SparcPhase::CANONICAL_ORDER {
            let task = PhaseTask {
                id: format!("{}-{}", project.id, phase.as_str()),
                project_id: project.id,
                phase,
                title: format!("{}: {} phase", project.name, phase.as_str()),
                agent_type: optimal_agent_for(phase).to_string(),
                estimated_effort_min: estimated_effort(phase),
                depends_on: prior.clone(),
            };
            match serde_json::to_value(&task) {
                Ok(value) => {
                    let receipt = self.kv.store(&task.id, value, TASKS_NAMESPACE).await;
                    if !receipt.is_success() {
                        warn!(task_id = task.id, "Phase task persistence failed");
                    }
                }
                Err(e) => warn!(error = %e, "Phase task serialization failed"),
            }
            prior = Some(task.id.clone());
            tasks.push(task);
        }
        tasks
    }

    // ========================================================================
    // Phase execution
    // ========================================================================

    /// Execute one phase, deriving ADR documents when the architecture
    /// phase completes.
    #[instrument(skip(self), fields(phase = %phase))]
    pub async fn execute_phase(
        &self,
        project_id: Uuid,
        phase: SparcPhase,
    ) -> DomainResult<PhaseResult> {
        let result = self.sparc.execute_phase(project_id, phase).await?;
        if phase == SparcPhase::Architecture && result.success {
            let adrs = self.derive_adrs(project_id).await?;
            info!(project_id = %project_id, count = adrs.len(), "Derived ADRs");
        }
        Ok(result)
    }

    /// One ADR document per selected architectural pattern.
    pub async fn derive_adrs(&self, project_id: Uuid) -> DomainResult<Vec<Document>> {
        let project = self
            .sparc
            .get_project(project_id)
            .await
            .ok_or(DomainError::ProjectNotFound(project_id))?;
        let Some(architecture) = project.effective_architecture() else {
            return Err(DomainError::PreconditionFailed(
                "ADR derivation requires a completed architecture".to_string(),
            ));
        };

        let mut documents = Vec::new();
        for (i, pattern) in architecture.architectural_patterns.iter().enumerate() {
            let document = Document::new(
                DocumentKind::Adr,
                format!("ADR-{:03}: Adopt {}", i + 1, pattern),
                adr_markdown(&project.name, pattern, architecture.components.len()),
            )
            .with_metadata("pattern", json!(pattern))
            .with_metadata("project_id", json!(project_id));

            let key = document.storage_key();
            let receipt = self
                .kv
                .store(&key, serde_json::to_value(&document)?, DOCUMENTS_NAMESPACE)
                .await;
            if !receipt.is_success() {
                warn!(key, "ADR persistence failed");
            }
            documents.push(document);
        }
        Ok(documents)
    }

    /// Documents currently stored for the project tree, keyed by path.
    pub async fn list_documents(&self, pattern: &str) -> DomainResult<HashMap<String, Value>> {
        self.kv.search(pattern, DOCUMENTS_NAMESPACE).await
    }
}

/// Map a phase to the closest registry agent type for seeded agents.
fn agent_type_of(phase: SparcPhase) -> AgentType {
    match phase {
        SparcPhase::Specification => AgentType::Analyst,
        SparcPhase::Pseudocode => AgentType::Researcher,
        SparcPhase::Architecture => AgentType::Architect,
        SparcPhase::Refinement => AgentType::Optimizer,
        SparcPhase::Completion => AgentType::Coder,
    }
}

fn vision_markdown(project: &SparcProject) -> String {
    let mut body = format!("# {} Vision\n\n{}\n", project.name, project.description);
    if !project.requirements.is_empty() {
        body.push_str("\n## Requirements\n");
        for requirement in &project.requirements {
            body.push_str(&format!("- {requirement}\n"));
        }
    }
    if !project.constraints.is_empty() {
        body.push_str("\n## Constraints\n");
        for constraint in &project.constraints {
            body.push_str(&format!("- {constraint}\n"));
        }
    }
    body
}

fn adr_markdown(project_name: &str, pattern: &str, component_count: usize) -> String {
    format!(
        "# Adopt {pattern}\n\n## Status\nAccepted\n\n## Context\n{project_name} derives \
         {component_count} components from its design; the {pattern} pattern was selected \
         by the architecture heuristics.\n\n## Decision\nStructure the system following \
         {pattern}.\n\n## Consequences\nComponent boundaries and deployment follow the \
         pattern's conventions.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::InMemoryKvStore;
    use crate::domain::models::{
        Complexity, ProjectDomain, SparcSettings, SwarmConfig, WorkflowSettings,
    };
    use crate::services::event_bus::EventBus;
    use crate::services::template_registry::TemplateRegistry;

    fn coordinator() -> (ProjectCoordinator, Arc<dyn KvStore>) {
        let bus = Arc::new(EventBus::default());
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let sparc = Arc::new(SparcEngine::new(
            SparcSettings::default(),
            Arc::new(TemplateRegistry::with_builtins()),
            kv.clone(),
            bus.clone(),
        ));
        let workflows = Arc::new(WorkflowEngine::new(
            WorkflowSettings::default(),
            kv.clone(),
            bus.clone(),
        ));
        let swarm = Arc::new(SwarmCoordinator::new(SwarmConfig::default(), bus));
        (
            ProjectCoordinator::new(sparc, workflows, swarm, kv.clone()),
            kv,
        )
    }

    fn request() -> CreateProject {
        CreateProject {
            name: "DemoAPI".to_string(),
            domain: ProjectDomain::RestApi,
            complexity: Complexity::Moderate,
            requirements: vec!["CRUD users".to_string()],
            constraints: vec!["single region".to_string()],
            description: "demo".to_string(),
        }
    }

    #[tokio::test]
    async fn test_initialize_project() {
        let (coordinator, kv) = coordinator();
        let init = coordinator.initialize_project(request()).await.unwrap();

        // Vision document stored under the vision prefix.
        assert!(init.vision_key.starts_with("docs/01-vision/"));
        assert!(kv
            .retrieve(&init.vision_key, DOCUMENTS_NAMESPACE)
            .await
            .unwrap()
            .is_some());

        // All four document workflows fired.
        assert_eq!(init.workflow_ids.len(), 4);

        // One phase task per phase, chained by dependency.
        assert_eq!(init.phase_tasks.len(), 5);
        assert!(init.phase_tasks[0].depends_on.is_none());
        for pair in init.phase_tasks.windows(2) {
            assert_eq!(pair[1].depends_on.as_deref(), Some(pair[0].id.as_str()));
        }
        assert_eq!(init.phase_tasks[2].agent_type, "system-architect");

        // The SPARC swarm was seeded.
        assert_eq!(coordinator.swarm.registry().count().await, 5);
    }

    #[tokio::test]
    async fn test_initialize_is_repeatable() {
        let (coordinator, _) = coordinator();
        coordinator.initialize_project(request()).await.unwrap();
        // Second initialization re-uses registered workflows and seeded
        // agents without erroring.
        let second = coordinator.initialize_project(request()).await.unwrap();
        assert_eq!(second.workflow_ids.len(), 4);
        assert_eq!(coordinator.swarm.registry().count().await, 5);
    }

    #[tokio::test]
    async fn test_architecture_phase_derives_adrs() {
        let (coordinator, kv) = coordinator();
        let init = coordinator.initialize_project(request()).await.unwrap();
        let id = init.project.id;

        coordinator
            .execute_phase(id, SparcPhase::Specification)
            .await
            .unwrap();
        coordinator
            .execute_phase(id, SparcPhase::Pseudocode)
            .await
            .unwrap();
        coordinator
            .execute_phase(id, SparcPhase::Architecture)
            .await
            .unwrap();

        let adrs = kv.search("docs/02-adrs", DOCUMENTS_NAMESPACE).await.unwrap();
        assert!(!adrs.is_empty());
    }

    #[tokio::test]
    async fn test_adr_derivation_requires_architecture() {
        let (coordinator, _) = coordinator();
        let init = coordinator.initialize_project(request()).await.unwrap();
        assert!(matches!(
            coordinator.derive_adrs(init.project.id).await.unwrap_err(),
            DomainError::PreconditionFailed(_)
        ));
    }

    #[test]
    fn test_phase_agent_mapping() {
        assert_eq!(optimal_agent_for(SparcPhase::Specification), "system-analyst");
        assert_eq!(optimal_agent_for(SparcPhase::Pseudocode), "algorithm-designer");
        assert_eq!(optimal_agent_for(SparcPhase::Architecture), "system-architect");
        assert_eq!(optimal_agent_for(SparcPhase::Refinement), "performance-optimizer");
        assert_eq!(optimal_agent_for(SparcPhase::Completion), "full-stack-developer");
    }
}

//! SPARC phase engine.
//!
//! Drives projects through the five canonical phases — specification,
//! pseudocode, architecture, refinement, completion — with per-phase
//! prerequisite gates, validation, and deliverable production. Phase order
//! within one project is strict; each phase refuses to run unless the prior
//! phase's product is present.

pub mod architecture;
pub mod completion;
pub mod pseudocode;
pub mod refinement;
pub mod specification;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Complexity, CustomizationReport, Deliverable, PhaseExecutionStatus, PhaseState, ProjectDomain,
    RefinementFeedback, SparcPhase, SparcProject, SparcSettings, ValidationResult,
};
use crate::domain::ports::KvStore;
use crate::services::event_bus::{EventBus, EventCategory, EventPayload, EventSeverity};
use crate::services::template_registry::TemplateRegistry;

use architecture::ArchitectureEngine;
use completion::CompletionEngine;
use pseudocode::PseudocodeEngine;
use refinement::RefinementEngine;
use specification::SpecificationEngine;

/// KV namespace projects persist into.
pub const PROJECTS_NAMESPACE: &str = "projects";

/// Request to create a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub domain: ProjectDomain,
    #[serde(default)]
    pub complexity: Complexity,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub description: String,
}

/// Advisory metrics attached to a phase result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseMetrics {
    pub duration_min: f64,
    /// Mean validator score.
    pub quality_score: f64,
    /// Fraction of validators that passed.
    pub completeness: f64,
    /// Size-derived payload complexity, in [0, 1].
    pub complexity_score: f64,
}

/// Result of executing one phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseResult {
    pub phase: SparcPhase,
    pub success: bool,
    pub deliverables: Vec<Deliverable>,
    pub metrics: PhaseMetrics,
    pub next_phase: Option<SparcPhase>,
    pub recommendations: Vec<String>,
    pub validation_results: Vec<ValidationResult>,
}

/// Report from `validate_completion`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionReport {
    pub ready_for_production: bool,
    pub completed_phases: Vec<SparcPhase>,
    pub checks: Vec<ValidationResult>,
}

/// Internal product of one phase sub-engine run.
struct PhaseOutcome {
    deliverables: Vec<Deliverable>,
    validation_results: Vec<ValidationResult>,
    recommendations: Vec<String>,
    /// Item count driving the complexity score.
    payload_items: usize,
    apply: PhasePayload,
}

/// Payload written back into the project on success.
enum PhasePayload {
    Specification(crate::domain::models::Specification),
    Pseudocode(crate::domain::models::Pseudocode),
    Architecture(crate::domain::models::Architecture),
    Refinement(crate::domain::models::Refinement),
    Implementation(crate::domain::models::Implementation),
}

/// The SPARC phase engine.
pub struct SparcEngine {
    settings: SparcSettings,
    projects: RwLock<HashMap<Uuid, SparcProject>>,
    /// Deliverable records per project.
    artifacts: RwLock<HashMap<Uuid, Vec<Deliverable>>>,
    /// Feedback queued for the next refinement run, per project.
    pending_feedback: RwLock<HashMap<Uuid, RefinementFeedback>>,
    templates: Arc<TemplateRegistry>,
    kv: Arc<dyn KvStore>,
    event_bus: Arc<EventBus>,
}

impl SparcEngine {
    pub fn new(
        settings: SparcSettings,
        templates: Arc<TemplateRegistry>,
        kv: Arc<dyn KvStore>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            settings,
            projects: RwLock::new(HashMap::new()),
            artifacts: RwLock::new(HashMap::new()),
            pending_feedback: RwLock::new(HashMap::new()),
            templates,
            kv,
            event_bus,
        }
    }

    pub fn templates(&self) -> Arc<TemplateRegistry> {
        self.templates.clone()
    }

    // ========================================================================
    // Project lifecycle
    // ========================================================================

    /// Create a project.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_project(&self, request: CreateProject) -> DomainResult<SparcProject> {
        if request.name.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "Project name cannot be empty".to_string(),
            ));
        }
        let project = SparcProject::new(request.name, request.domain)
            .with_description(request.description)
            .with_complexity(request.complexity)
            .with_requirements(request.requirements)
            .with_constraints(request.constraints);

        self.projects
            .write()
            .await
            .insert(project.id, project.clone());
        self.persist(&project).await;
        info!(project_id = %project.id, "Created project");
        Ok(project)
    }

    /// Snapshot of one project.
    pub async fn get_project(&self, id: Uuid) -> Option<SparcProject> {
        self.projects.read().await.get(&id).cloned()
    }

    /// Projects filtered by domain and status ("completed" / "in-progress").
    pub async fn list_projects(
        &self,
        domain: Option<ProjectDomain>,
        status: Option<&str>,
    ) -> Vec<SparcProject> {
        let mut projects: Vec<SparcProject> = self
            .projects
            .read()
            .await
            .values()
            .filter(|p| domain.is_none_or(|d| p.domain == d))
            .filter(|p| match status {
                Some("completed") => p.is_complete(),
                Some("in-progress") => !p.is_complete(),
                _ => true,
            })
            .cloned()
            .collect();
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        projects
    }

    /// Deliverable records for a project, optionally filtered by kind.
    pub async fn generate_artifacts(
        &self,
        project_id: Uuid,
        kinds: Option<&[String]>,
    ) -> DomainResult<Vec<Deliverable>> {
        if self.get_project(project_id).await.is_none() {
            return Err(DomainError::ProjectNotFound(project_id));
        }
        let artifacts = self.artifacts.read().await;
        Ok(artifacts
            .get(&project_id)
            .map(|all| {
                all.iter()
                    .filter(|d| kinds.is_none_or(|ks| ks.iter().any(|k| *k == d.kind)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Seed the project's phase payloads from a template.
    #[instrument(skip(self))]
    pub async fn apply_template(
        &self,
        project_id: Uuid,
        template_id: &str,
    ) -> DomainResult<CustomizationReport> {
        let snapshot = self
            .get_project(project_id)
            .await
            .ok_or(DomainError::ProjectNotFound(project_id))?;
        let application = self.templates.apply(template_id, &snapshot).await?;

        let mut projects = self.projects.write().await;
        let project = projects
            .get_mut(&project_id)
            .ok_or(DomainError::ProjectNotFound(project_id))?;
        if project.specification.is_none() {
            project.specification = Some(application.specification);
        }
        if project.pseudocode.is_none() {
            project.pseudocode = Some(application.pseudocode);
        }
        if project.architecture.is_none() {
            project.architecture = Some(application.architecture);
        }
        project.updated_at = chrono::Utc::now();
        let snapshot = project.clone();
        drop(projects);

        self.persist(&snapshot).await;
        Ok(application.report)
    }

    // ========================================================================
    // Phase execution
    // ========================================================================

    /// Execute one phase of a project.
    #[instrument(skip(self), fields(phase = %phase))]
    pub async fn execute_phase(
        &self,
        project_id: Uuid,
        phase: SparcPhase,
    ) -> DomainResult<PhaseResult> {
        let started = Instant::now();

        // Prerequisite gate and start bookkeeping under one lock hold.
        let snapshot = {
            let mut projects = self.projects.write().await;
            let project = projects
                .get_mut(&project_id)
                .ok_or(DomainError::ProjectNotFound(project_id))?;

            if let Err(reason) = Self::check_prerequisites(project, phase) {
                project.progress.record_failed(
                    phase,
                    vec![ValidationResult::failed(
                        "prerequisite",
                        0.0,
                        &reason,
                        "Run the prior phases in canonical order first",
                    )],
                );
                project.updated_at = chrono::Utc::now();
                let failed = project.clone();
                drop(projects);
                self.persist(&failed).await;
                self.emit_phase_failed(project_id, phase, &reason);
                return Err(DomainError::PreconditionFailed(reason));
            }

            project.current_phase = phase;
            project.progress.record_started(phase);
            project.updated_at = chrono::Utc::now();
            project.clone()
        };

        self.event_bus.publish(
            EventSeverity::Info,
            EventCategory::Phase,
            EventPayload::PhaseStarted {
                project_id,
                phase: phase.as_str().to_string(),
            },
        );

        // Run the phase sub-engine on the snapshot; the lock is not held.
        let outcome = self.run_phase_engine(&snapshot, phase).await?;

        if self.settings.strict_validation
            && outcome.validation_results.iter().any(|v| !v.passed)
        {
            let failed: Vec<String> = outcome
                .validation_results
                .iter()
                .filter(|v| !v.passed)
                .map(|v| v.criterion.clone())
                .collect();
            let reason = format!("strict validation failed: {}", failed.join(", "));
            let mut projects = self.projects.write().await;
            if let Some(project) = projects.get_mut(&project_id) {
                project
                    .progress
                    .record_failed(phase, outcome.validation_results.clone());
                project.updated_at = chrono::Utc::now();
            }
            drop(projects);
            self.emit_phase_failed(project_id, phase, &reason);
            return Err(DomainError::ValidationFailed(reason));
        }

        // Fold the result back into the project.
        let duration_min = started.elapsed().as_secs_f64() / 60.0;
        let metrics = PhaseMetrics {
            duration_min,
            quality_score: mean_score(&outcome.validation_results),
            completeness: completeness(&outcome.validation_results),
            complexity_score: (outcome.payload_items as f64 / 10.0).clamp(0.0, 1.0),
        };

        let persisted = {
            let mut projects = self.projects.write().await;
            let project = projects
                .get_mut(&project_id)
                .ok_or(DomainError::ProjectNotFound(project_id))?;

            match outcome.apply {
                PhasePayload::Specification(s) => project.specification = Some(s),
                PhasePayload::Pseudocode(p) => project.pseudocode = Some(p),
                PhasePayload::Architecture(a) => project.architecture = Some(a),
                PhasePayload::Refinement(r) => project.refinements.push(r),
                PhasePayload::Implementation(i) => project.implementation = Some(i),
            }

            let state = PhaseState {
                status: PhaseExecutionStatus::Completed,
                started_at: project
                    .progress
                    .phase_status
                    .get(&phase)
                    .and_then(|s| s.started_at),
                completed_at: Some(chrono::Utc::now()),
                duration_min,
                deliverables: outcome.deliverables.iter().map(|d| d.id).collect(),
                validation_results: outcome.validation_results.clone(),
            };
            project.progress.record_completed(phase, state);
            project.updated_at = chrono::Utc::now();
            project.clone()
        };

        self.artifacts
            .write()
            .await
            .entry(project_id)
            .or_default()
            .extend(outcome.deliverables.iter().cloned());

        self.persist(&persisted).await;
        self.event_bus.publish(
            EventSeverity::Info,
            EventCategory::Phase,
            EventPayload::PhaseCompleted {
                project_id,
                phase: phase.as_str().to_string(),
            },
        );
        info!(project_id = %project_id, duration_min, "Phase completed");

        Ok(PhaseResult {
            phase,
            success: true,
            deliverables: outcome.deliverables,
            metrics,
            next_phase: phase.next(),
            recommendations: outcome.recommendations,
            validation_results: outcome.validation_results,
        })
    }

    /// Execute every remaining phase in canonical order.
    pub async fn execute_full(&self, project_id: Uuid) -> DomainResult<Vec<PhaseResult>> {
        let completed: Vec<SparcPhase> = self
            .get_project(project_id)
            .await
            .ok_or(DomainError::ProjectNotFound(project_id))?
            .progress
            .completed_phases;

        let mut results = Vec::new();
        for phase in SparcPhase::CANONICAL_ORDER {
            if completed.contains(&phase) {
                continue;
            }
            results.push(self.execute_phase(project_id, phase).await?);
        }
        Ok(results)
    }

    /// Queue feedback and run a refinement iteration.
    ///
    /// When the refinement phase has not run yet, this executes it in place;
    /// afterwards each call appends a fresh iteration, which is the only way
    /// to mutate deliverables of a terminal phase.
    #[instrument(skip(self, feedback))]
    pub async fn refine_implementation(
        &self,
        project_id: Uuid,
        feedback: RefinementFeedback,
    ) -> DomainResult<PhaseResult> {
        self.pending_feedback
            .write()
            .await
            .insert(project_id, feedback);

        let project = self
            .get_project(project_id)
            .await
            .ok_or(DomainError::ProjectNotFound(project_id))?;

        if project.progress.status_of(SparcPhase::Refinement) != PhaseExecutionStatus::Completed {
            return self.execute_phase(project_id, SparcPhase::Refinement).await;
        }

        // Append a new iteration without touching completed-phase bookkeeping.
        let started = Instant::now();
        let outcome = self.run_phase_engine(&project, SparcPhase::Refinement).await?;
        let duration_min = started.elapsed().as_secs_f64() / 60.0;
        let metrics = PhaseMetrics {
            duration_min,
            quality_score: mean_score(&outcome.validation_results),
            completeness: completeness(&outcome.validation_results),
            complexity_score: (outcome.payload_items as f64 / 10.0).clamp(0.0, 1.0),
        };

        let persisted = {
            let mut projects = self.projects.write().await;
            let project = projects
                .get_mut(&project_id)
                .ok_or(DomainError::ProjectNotFound(project_id))?;
            if let PhasePayload::Refinement(r) = outcome.apply {
                project.refinements.push(r);
            }
            project.updated_at = chrono::Utc::now();
            project.clone()
        };
        self.artifacts
            .write()
            .await
            .entry(project_id)
            .or_default()
            .extend(outcome.deliverables.iter().cloned());
        self.persist(&persisted).await;

        Ok(PhaseResult {
            phase: SparcPhase::Refinement,
            success: true,
            deliverables: outcome.deliverables,
            metrics,
            next_phase: SparcPhase::Refinement.next(),
            recommendations: outcome.recommendations,
            validation_results: outcome.validation_results,
        })
    }

    /// Production-readiness validation over the whole project.
    pub async fn validate_completion(&self, project_id: Uuid) -> DomainResult<CompletionReport> {
        let project = self
            .get_project(project_id)
            .await
            .ok_or(DomainError::ProjectNotFound(project_id))?;

        let mut checks = Vec::new();
        let all_phases = project.is_complete();
        if all_phases {
            checks.push(ValidationResult::passed(
                "phases-completed",
                1.0,
                "all five phases completed",
            ));
        } else {
            checks.push(ValidationResult::failed(
                "phases-completed",
                project.progress.overall_progress,
                format!(
                    "{}/5 phases completed",
                    project.progress.completed_phases.len()
                ),
                "Execute the remaining phases in canonical order",
            ));
        }

        let implementation_ok = match &project.implementation {
            Some(implementation) => {
                let results = CompletionEngine::validate(implementation);
                let ok = results.iter().all(|v| v.passed);
                checks.extend(results);
                ok
            }
            None => {
                checks.push(ValidationResult::failed(
                    "implementation",
                    0.0,
                    "no implementation recorded",
                    "Run the completion phase",
                ));
                false
            }
        };

        Ok(CompletionReport {
            ready_for_production: all_phases && implementation_ok,
            completed_phases: project.progress.completed_phases,
            checks,
        })
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// A phase refuses to run unless the prior phase's product is present.
    fn check_prerequisites(project: &SparcProject, phase: SparcPhase) -> Result<(), String> {
        match phase {
            SparcPhase::Specification => Ok(()),
            SparcPhase::Pseudocode => match &project.specification {
                Some(s) if !s.functional_requirements.is_empty() => Ok(()),
                Some(_) => Err(
                    "pseudocode requires a specification with functional requirements".to_string(),
                ),
                None => Err("pseudocode requires a completed specification".to_string()),
            },
            SparcPhase::Architecture => match &project.pseudocode {
                Some(p) if !p.algorithms.is_empty() => Ok(()),
                Some(_) => Err("architecture requires pseudocode with algorithms".to_string()),
                None => Err("architecture requires completed pseudocode".to_string()),
            },
            SparcPhase::Refinement => {
                if project.architecture.is_some() {
                    Ok(())
                } else {
                    Err("refinement requires a completed architecture".to_string())
                }
            }
            SparcPhase::Completion => {
                if project.effective_architecture().is_some() {
                    Ok(())
                } else {
                    Err("completion requires a completed architecture".to_string())
                }
            }
        }
    }

    /// Dispatch to the phase-specific engine. The project snapshot carries
    /// every prerequisite payload (checked by the caller).
    async fn run_phase_engine(
        &self,
        project: &SparcProject,
        phase: SparcPhase,
    ) -> DomainResult<PhaseOutcome> {
        match phase {
            SparcPhase::Specification => {
                let output = SpecificationEngine::generate(project, &self.templates).await;
                let deliverables = vec![
                    Deliverable::new("specification", "specification", phase),
                    Deliverable::new("risk-assessment", "risk-assessment", phase),
                    Deliverable::new("acceptance-criteria", "acceptance-criteria", phase),
                ];
                Ok(PhaseOutcome {
                    payload_items: output.specification.functional_requirements.len(),
                    deliverables,
                    validation_results: output.validation_results,
                    recommendations: output.recommendations,
                    apply: PhasePayload::Specification(output.specification),
                })
            }
            SparcPhase::Pseudocode => {
                let specification = project.specification.as_ref().ok_or_else(|| {
                    DomainError::Internal("prerequisite check missed specification".to_string())
                })?;
                let output = PseudocodeEngine::generate(specification);
                let mut deliverables: Vec<Deliverable> = output
                    .pseudocode
                    .algorithms
                    .iter()
                    .map(|a| Deliverable::new(format!("algorithm:{}", a.name), "algorithm", phase))
                    .collect();
                deliverables.push(Deliverable::new(
                    "complexity-analysis",
                    "complexity-analysis",
                    phase,
                ));
                Ok(PhaseOutcome {
                    payload_items: output.pseudocode.algorithms.len()
                        + output.pseudocode.data_structures.len(),
                    deliverables,
                    validation_results: output.validation_results,
                    recommendations: output.recommendations,
                    apply: PhasePayload::Pseudocode(output.pseudocode),
                })
            }
            SparcPhase::Architecture => {
                let pseudocode = project.pseudocode.as_ref().ok_or_else(|| {
                    DomainError::Internal("prerequisite check missed pseudocode".to_string())
                })?;
                let output = ArchitectureEngine::generate(pseudocode);
                let deliverables = vec![
                    Deliverable::new("component-model", "component-model", phase),
                    Deliverable::new("component-diagram", "component-diagram", phase),
                    Deliverable::new("data-flow", "data-flow", phase),
                    Deliverable::new("deployment-plan", "deployment-plan", phase),
                ];
                Ok(PhaseOutcome {
                    payload_items: output.architecture.components.len(),
                    deliverables,
                    validation_results: output.validation_results,
                    recommendations: output.recommendations,
                    apply: PhasePayload::Architecture(output.architecture),
                })
            }
            SparcPhase::Refinement => {
                let architecture = project.effective_architecture().ok_or_else(|| {
                    DomainError::Internal("prerequisite check missed architecture".to_string())
                })?;
                let feedback = self
                    .pending_feedback
                    .write()
                    .await
                    .remove(&project.id)
                    .unwrap_or_else(RefinementEngine::baseline_feedback);
                let iteration = project.refinements.len() as u32 + 1;
                let output = RefinementEngine::generate(architecture, &feedback, iteration);
                let deliverables = vec![
                    Deliverable::new("optimization-strategies", "optimization-strategies", phase),
                    Deliverable::new("refined-architecture", "refined-architecture", phase),
                    Deliverable::new("benchmark-report", "benchmark-report", phase),
                ];
                Ok(PhaseOutcome {
                    payload_items: output.refinement.optimization_strategies.len()
                        + output.refinement.performance_optimizations.len(),
                    deliverables,
                    validation_results: output.validation_results,
                    recommendations: output.recommendations,
                    apply: PhasePayload::Refinement(output.refinement),
                })
            }
            SparcPhase::Completion => {
                let architecture = project.effective_architecture().ok_or_else(|| {
                    DomainError::Internal("prerequisite check missed architecture".to_string())
                })?;
                let output = CompletionEngine::generate(project, architecture);
                let deliverables = vec![
                    Deliverable::new("implementation-records", "implementation-records", phase),
                    Deliverable::new("test-plan", "test-plan", phase),
                    Deliverable::new("documentation-set", "documentation-set", phase),
                    Deliverable::new("readiness-report", "readiness-report", phase),
                ];
                Ok(PhaseOutcome {
                    payload_items: output.implementation.source_code.len(),
                    deliverables,
                    validation_results: output.validation_results,
                    recommendations: output.recommendations,
                    apply: PhasePayload::Implementation(output.implementation),
                })
            }
        }
    }

    fn emit_phase_failed(&self, project_id: Uuid, phase: SparcPhase, error: &str) {
        warn!(project_id = %project_id, phase = %phase, error, "Phase failed");
        self.event_bus.publish(
            EventSeverity::Error,
            EventCategory::Phase,
            EventPayload::PhaseFailed {
                project_id,
                phase: phase.as_str().to_string(),
                error: error.to_string(),
            },
        );
    }

    async fn persist(&self, project: &SparcProject) {
        match serde_json::to_value(project) {
            Ok(value) => {
                let receipt = self
                    .kv
                    .store(&project.id.to_string(), value, PROJECTS_NAMESPACE)
                    .await;
                if !receipt.is_success() {
                    warn!(project_id = %project.id, "Project persistence failed");
                }
            }
            Err(e) => warn!(project_id = %project.id, error = %e, "Project serialization failed"),
        }
    }
}

fn mean_score(results: &[ValidationResult]) -> f64 {
    if results.is_empty() {
        return 1.0;
    }
    results.iter().map(|v| v.score).sum::<f64>() / results.len() as f64
}

fn completeness(results: &[ValidationResult]) -> f64 {
    if results.is_empty() {
        return 1.0;
    }
    results.iter().filter(|v| v.passed).count() as f64 / results.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::InMemoryKvStore;

    fn engine() -> SparcEngine {
        SparcEngine::new(
            SparcSettings::default(),
            Arc::new(TemplateRegistry::with_builtins()),
            Arc::new(InMemoryKvStore::new()),
            Arc::new(EventBus::default()),
        )
    }

    fn request() -> CreateProject {
        CreateProject {
            name: "DemoAPI".to_string(),
            domain: ProjectDomain::RestApi,
            complexity: Complexity::Moderate,
            requirements: vec!["CRUD users".to_string()],
            constraints: vec![],
            description: "demo".to_string(),
        }
    }

    #[tokio::test]
    async fn test_full_pipeline_in_order() {
        let engine = engine();
        let project = engine.create_project(request()).await.unwrap();

        for (i, phase) in SparcPhase::CANONICAL_ORDER.into_iter().enumerate() {
            let result = engine.execute_phase(project.id, phase).await.unwrap();
            assert!(result.success);
            assert!(!result.deliverables.is_empty());

            let snapshot = engine.get_project(project.id).await.unwrap();
            assert_eq!(snapshot.progress.completed_phases.len(), i + 1);
            assert_eq!(
                snapshot.progress.status_of(phase),
                PhaseExecutionStatus::Completed
            );
            assert!(snapshot.progress.is_canonical_prefix());
        }

        let finished = engine.get_project(project.id).await.unwrap();
        assert!((finished.progress.overall_progress - 1.0).abs() < f64::EPSILON);
        assert_eq!(finished.current_phase, SparcPhase::Completion);

        let report = engine.validate_completion(project.id).await.unwrap();
        assert!(report.ready_for_production);
    }

    #[tokio::test]
    async fn test_prerequisite_failure_leaves_progress_unchanged() {
        let engine = engine();
        let project = engine.create_project(request()).await.unwrap();

        let err = engine
            .execute_phase(project.id, SparcPhase::Pseudocode)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::PreconditionFailed(_)));

        let snapshot = engine.get_project(project.id).await.unwrap();
        assert!(snapshot.progress.completed_phases.is_empty());
        assert_eq!(
            snapshot.progress.status_of(SparcPhase::Pseudocode),
            PhaseExecutionStatus::Failed
        );
        assert!(snapshot.specification.is_none());
    }

    #[tokio::test]
    async fn test_execute_full() {
        let engine = engine();
        let project = engine.create_project(request()).await.unwrap();
        let results = engine.execute_full(project.id).await.unwrap();
        assert_eq!(results.len(), 5);
        assert!(engine.get_project(project.id).await.unwrap().is_complete());
    }

    #[tokio::test]
    async fn test_refine_appends_iterations() {
        let engine = engine();
        let project = engine.create_project(request()).await.unwrap();
        engine.execute_full(project.id).await.unwrap();

        let before = engine.get_project(project.id).await.unwrap();
        assert_eq!(before.refinements.len(), 1);

        let feedback = RefinementFeedback {
            security_issues: vec!["tokens in logs".to_string()],
            ..RefinementFeedback::default()
        };
        let result = engine
            .refine_implementation(project.id, feedback)
            .await
            .unwrap();
        assert!(result.success);

        let after = engine.get_project(project.id).await.unwrap();
        assert_eq!(after.refinements.len(), 2);
        assert_eq!(after.refinements[1].iteration, 2);
        // Completed-phase bookkeeping is untouched by extra iterations.
        assert_eq!(after.progress.completed_phases.len(), 5);
    }

    #[tokio::test]
    async fn test_validate_completion_before_finish() {
        let engine = engine();
        let project = engine.create_project(request()).await.unwrap();
        let report = engine.validate_completion(project.id).await.unwrap();
        assert!(!report.ready_for_production);
        assert!(report.checks.iter().any(|c| !c.passed));
    }

    #[tokio::test]
    async fn test_artifacts_accumulate_and_filter() {
        let engine = engine();
        let project = engine.create_project(request()).await.unwrap();
        engine
            .execute_phase(project.id, SparcPhase::Specification)
            .await
            .unwrap();

        let all = engine.generate_artifacts(project.id, None).await.unwrap();
        assert_eq!(all.len(), 3);

        let kinds = vec!["risk-assessment".to_string()];
        let filtered = engine
            .generate_artifacts(project.id, Some(&kinds))
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].kind, "risk-assessment");
    }

    #[tokio::test]
    async fn test_apply_template_seeds_payloads() {
        let engine = engine();
        let project = engine.create_project(request()).await.unwrap();
        let report = engine
            .apply_template(project.id, "rest-api-service")
            .await
            .unwrap();
        assert_eq!(report.template_id, "rest-api-service");

        let snapshot = engine.get_project(project.id).await.unwrap();
        assert!(snapshot.specification.is_some());
        assert!(snapshot.pseudocode.is_some());
        assert!(snapshot.architecture.is_some());
    }

    #[tokio::test]
    async fn test_list_projects_filters() {
        let engine = engine();
        engine.create_project(request()).await.unwrap();
        let other = engine
            .create_project(CreateProject {
                name: "Swarm".to_string(),
                domain: ProjectDomain::SwarmCoordination,
                complexity: Complexity::High,
                requirements: vec![],
                constraints: vec![],
                description: String::new(),
            })
            .await
            .unwrap();
        engine.execute_full(other.id).await.unwrap();

        assert_eq!(engine.list_projects(None, None).await.len(), 2);
        assert_eq!(
            engine
                .list_projects(Some(ProjectDomain::RestApi), None)
                .await
                .len(),
            1
        );
        assert_eq!(engine.list_projects(None, Some("completed")).await.len(), 1);
        assert_eq!(
            engine.list_projects(None, Some("in-progress")).await.len(),
            1
        );
    }
}

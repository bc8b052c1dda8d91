//! Template registry.
//!
//! Holds named domain templates, scores them against projects, and applies
//! the best fit. A template contributes starting payloads for the
//! specification, pseudocode, and architecture phases; the phase engines
//! then enhance them with project-specific detail.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AcceptanceCriterion, Algorithm, Architecture, CompatibilityScore, Complexity, ComplexityAnalysis,
    Component, ComponentRole, ControlFlow, CustomizationReport, DataStructureDef,
    FunctionalRequirement, InterfaceDef, NonFunctionalRequirement, ProjectDomain, Pseudocode,
    QualityAttribute, RequirementPriority, Risk, RiskAssessment, RiskLevel, SparcProject,
    Specification, TemplateMetadata, TemplateUsage,
};

// ============================================================================
// Template trait
// ============================================================================

/// A domain template: metadata plus three phase-payload generators.
pub trait DomainTemplate: Send + Sync {
    fn metadata(&self) -> TemplateMetadata;
    fn generate_specification(&self, project: &SparcProject) -> Specification;
    fn generate_pseudocode(&self, project: &SparcProject) -> Pseudocode;
    fn generate_architecture(&self, project: &SparcProject) -> Architecture;
}

/// Product of applying a template to a project.
#[derive(Debug, Clone)]
pub struct TemplateApplication {
    pub template_id: String,
    pub specification: Specification,
    pub pseudocode: Pseudocode,
    pub architecture: Architecture,
    pub report: CustomizationReport,
}

struct RegisteredTemplate {
    template: Arc<dyn DomainTemplate>,
    usage: TemplateUsage,
}

/// Registry of domain templates keyed by template id.
pub struct TemplateRegistry {
    templates: RwLock<BTreeMap<String, RegisteredTemplate>>,
}

impl TemplateRegistry {
    /// Registry preloaded with the built-in domain templates.
    pub fn with_builtins() -> Self {
        let mut templates: BTreeMap<String, RegisteredTemplate> = BTreeMap::new();
        for template in builtin_templates() {
            templates.insert(
                template.metadata().id,
                RegisteredTemplate {
                    template,
                    usage: TemplateUsage::default(),
                },
            );
        }
        Self {
            templates: RwLock::new(templates),
        }
    }

    /// Empty registry.
    pub fn new() -> Self {
        Self {
            templates: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register a template, replacing any prior one with the same id.
    pub async fn register(&self, template: Arc<dyn DomainTemplate>) {
        let id = template.metadata().id;
        self.templates.write().await.insert(
            id,
            RegisteredTemplate {
                template,
                usage: TemplateUsage::default(),
            },
        );
    }

    /// Metadata and usage counters for every template, ordered by id.
    pub async fn list(&self) -> Vec<(TemplateMetadata, TemplateUsage)> {
        self.templates
            .read()
            .await
            .values()
            .map(|r| (r.template.metadata(), r.usage.clone()))
            .collect()
    }

    /// Compatibility score between a template and a project.
    ///
    /// Domain equality sets a 0.7 baseline (mismatch drops to 0.4);
    /// complexity misalignment subtracts up to 0.2; requirement coverage
    /// contributes up to 0.3. The score is monotone in coverage.
    pub fn score(metadata: &TemplateMetadata, project: &SparcProject) -> CompatibilityScore {
        let mut score = if metadata.domain == project.domain {
            0.7
        } else {
            0.7 - 0.3
        };

        let template_heavy = metadata.complexity >= Complexity::High;
        let template_simple = metadata.complexity == Complexity::Simple;
        if template_heavy && project.complexity == Complexity::Simple {
            score -= 0.2;
        }
        if template_simple && project.complexity == Complexity::Enterprise {
            score -= 0.1;
        }

        let requirement_coverage = coverage(&project.requirements, metadata);
        score += requirement_coverage * 0.3;

        CompatibilityScore {
            score: score.clamp(0.0, 1.0),
            requirement_coverage,
        }
    }

    /// Find the best compatible template for a project.
    ///
    /// Returns `None` when no template clears the compatibility threshold.
    #[instrument(skip(self, project), fields(project = %project.name))]
    pub async fn find_best(&self, project: &SparcProject) -> Option<(String, CompatibilityScore)> {
        let templates = self.templates.read().await;
        let mut best: Option<(String, CompatibilityScore)> = None;
        for (id, registered) in templates.iter() {
            let score = Self::score(&registered.template.metadata(), project);
            debug!(template = id, score = score.score, "Scored template");
            if !score.is_compatible() {
                continue;
            }
            if best.as_ref().is_none_or(|(_, s)| score.score > s.score) {
                best = Some((id.clone(), score));
            }
        }
        best
    }

    /// Apply a template by id, updating its usage counters.
    #[instrument(skip(self, project), fields(project = %project.name))]
    pub async fn apply(
        &self,
        template_id: &str,
        project: &SparcProject,
    ) -> DomainResult<TemplateApplication> {
        let mut templates = self.templates.write().await;
        let registered = templates
            .get_mut(template_id)
            .ok_or_else(|| DomainError::TemplateNotFound(template_id.to_string()))?;

        let specification = registered.template.generate_specification(project);
        let pseudocode = registered.template.generate_pseudocode(project);
        let architecture = registered.template.generate_architecture(project);
        registered.usage.record_use();

        let report = CustomizationReport {
            template_id: template_id.to_string(),
            project_id: project.id,
            customizations: vec![
                format!("Named deliverables after '{}'", project.name),
                format!(
                    "Seeded {} template requirements against {} project requirements",
                    registered.template.metadata().requirements.len(),
                    project.requirements.len()
                ),
            ],
            applied_at: Utc::now(),
        };

        info!(template_id, "Applied template");
        Ok(TemplateApplication {
            template_id: template_id.to_string(),
            specification,
            pseudocode,
            architecture,
            report,
        })
    }

    /// Apply the best compatible template, if any.
    pub async fn apply_best(&self, project: &SparcProject) -> Option<TemplateApplication> {
        let (id, _) = self.find_best(project).await?;
        self.apply(&id, project).await.ok()
    }

    /// Record a rating for a template.
    pub async fn rate(&self, template_id: &str, rating: f64) -> DomainResult<f64> {
        let mut templates = self.templates.write().await;
        let registered = templates
            .get_mut(template_id)
            .ok_or_else(|| DomainError::TemplateNotFound(template_id.to_string()))?;
        registered.usage.record_rating(rating);
        Ok(registered.usage.average_rating)
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Fraction of project requirements fuzzy-matched by template requirement
/// titles or tags.
fn coverage(project_requirements: &[String], metadata: &TemplateMetadata) -> f64 {
    if project_requirements.is_empty() {
        return 0.0;
    }
    let candidates: Vec<String> = metadata
        .requirements
        .iter()
        .chain(metadata.tags.iter())
        .map(|s| s.to_lowercase())
        .collect();

    let matched = project_requirements
        .iter()
        .filter(|req| {
            let req = req.to_lowercase();
            candidates.iter().any(|c| fuzzy_match(&req, c))
        })
        .count();
    matched as f64 / project_requirements.len() as f64
}

/// Two phrases fuzzy-match when one contains the other or they share a
/// token of at least four characters.
fn fuzzy_match(a: &str, b: &str) -> bool {
    if a.contains(b) || b.contains(a) {
        return true;
    }
    a.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 4)
        .any(|t| b.split(|c: char| !c.is_alphanumeric()).any(|u| u == t))
}

// ============================================================================
// Built-in templates
// ============================================================================

/// The built-in template set, one per well-known domain.
pub fn builtin_templates() -> Vec<Arc<dyn DomainTemplate>> {
    vec![
        Arc::new(RestApiTemplate),
        Arc::new(SwarmCoordinationTemplate),
        Arc::new(NeuralNetworksTemplate),
        Arc::new(MemorySystemsTemplate),
        Arc::new(GeneralTemplate),
    ]
}

fn fr(id: &str, title: &str, priority: RequirementPriority) -> FunctionalRequirement {
    FunctionalRequirement::new(id, title).with_priority(priority)
}

fn nfr(id: &str, category: &str, description: &str, target: &str) -> NonFunctionalRequirement {
    NonFunctionalRequirement {
        id: id.to_string(),
        category: category.to_string(),
        description: description.to_string(),
        target: target.to_string(),
    }
}

fn ac(id: &str, description: &str, covers: &[&str]) -> AcceptanceCriterion {
    AcceptanceCriterion {
        id: id.to_string(),
        description: description.to_string(),
        covers: covers.iter().map(|s| s.to_string()).collect(),
    }
}

fn risk(id: &str, description: &str, likelihood: RiskLevel, impact: RiskLevel) -> Risk {
    Risk {
        id: id.to_string(),
        description: description.to_string(),
        likelihood,
        impact,
    }
}

fn data_structure(name: &str, kind: &str, purpose: &str, operations: &[&str]) -> DataStructureDef {
    DataStructureDef {
        name: name.to_string(),
        kind: kind.to_string(),
        purpose: purpose.to_string(),
        operations: operations.iter().map(|s| s.to_string()).collect(),
    }
}

fn component(name: &str, role: ComponentRole, responsibility: &str, deps: &[&str]) -> Component {
    Component {
        id: name.to_lowercase().replace(' ', "-"),
        name: name.to_string(),
        role,
        responsibility: responsibility.to_string(),
        dependencies: deps.iter().map(|s| s.to_string()).collect(),
        provided_interfaces: Vec::new(),
        latency_target_ms: None,
    }
}

/// REST API service template.
pub struct RestApiTemplate;

impl DomainTemplate for RestApiTemplate {
    fn metadata(&self) -> TemplateMetadata {
        TemplateMetadata {
            id: "rest-api-service".to_string(),
            domain: ProjectDomain::RestApi,
            complexity: Complexity::Moderate,
            tags: vec!["rest".into(), "api".into(), "http".into(), "crud".into()],
            requirements: vec![
                "CRUD resource endpoints".into(),
                "Request validation".into(),
                "Authentication and authorization".into(),
                "Pagination and filtering".into(),
            ],
            estimated_time_min: 240,
        }
    }

    fn generate_specification(&self, project: &SparcProject) -> Specification {
        Specification {
            functional_requirements: vec![
                fr("FR-1", "Expose CRUD endpoints for each resource", RequirementPriority::High)
                    .with_description(format!("Resources derive from the {} domain model", project.name)),
                fr("FR-2", "Validate request payloads against schemas", RequirementPriority::High),
                fr("FR-3", "Authenticate callers and enforce authorization", RequirementPriority::High),
                fr("FR-4", "Support pagination, sorting, and filtering on list endpoints", RequirementPriority::Medium),
            ],
            non_functional_requirements: vec![
                nfr("NFR-1", "performance", "p99 request latency", "< 250 ms"),
                nfr("NFR-2", "reliability", "Availability", ">= 99.9%"),
                nfr("NFR-3", "security", "Transport encryption", "TLS 1.3"),
            ],
            constraints: project.constraints.clone(),
            assumptions: vec!["Clients speak JSON over HTTPS".into()],
            dependencies: vec!["Relational datastore".into(), "Identity provider".into()],
            acceptance_criteria: vec![
                ac("AC-1", "Every resource supports create, read, update, delete", &["FR-1"]),
                ac("AC-2", "Invalid payloads receive 422 with field-level errors", &["FR-2"]),
                ac("AC-3", "Unauthenticated requests receive 401", &["FR-3"]),
            ],
            risk_assessment: RiskAssessment {
                risks: vec![
                    risk("R-1", "Schema drift between API and datastore", RiskLevel::Medium, RiskLevel::Medium),
                    risk("R-2", "Credential leakage through logging", RiskLevel::Low, RiskLevel::High),
                ],
                mitigations: vec![
                    "Generate schemas from a single source of truth".into(),
                    "Scrub secrets from request logs".into(),
                ],
                overall_risk: RiskLevel::Medium,
            },
            success_metrics: vec![
                "All endpoints pass contract tests".into(),
                "p99 latency within target under nominal load".into(),
            ],
        }
    }

    fn generate_pseudocode(&self, _project: &SparcProject) -> Pseudocode {
        Pseudocode {
            algorithms: vec![
                Algorithm::new("HandleRequest", "Route, validate, and execute one API request")
                    .with_step("Match route and method")
                    .with_step("Authenticate and authorize the caller")
                    .with_step("Validate the payload against the resource schema")
                    .with_step("Execute the resource operation")
                    .with_step("Serialize the response with appropriate status"),
                Algorithm::new("PaginateQuery", "Apply cursor pagination to a list query")
                    .with_step("Decode the cursor into an offset key")
                    .with_step("Fetch limit+1 rows past the key")
                    .with_step("Emit the page and the next cursor"),
            ],
            data_structures: vec![
                data_structure("ResourceSchema", "record", "Field definitions and validation rules", &["validate", "coerce"]),
                data_structure("CursorPage", "record", "One page of results plus continuation cursor", &["next_cursor"]),
            ],
            control_flows: vec![ControlFlow {
                name: "request-lifecycle".into(),
                flow_type: "sequential".into(),
                description: "route -> authenticate -> validate -> execute -> respond".into(),
            }],
            optimizations: vec!["Cache schema compilation per resource".into()],
            dependencies: vec!["HTTP server".into(), "Datastore client".into()],
            complexity_analysis: ComplexityAnalysis {
                time: "O(1) per request plus query cost".into(),
                space: "O(page_size) per list request".into(),
                scalability: "Horizontal behind a load balancer".into(),
                worst_case: "O(n) unindexed filter".into(),
                average_case: "O(log n) indexed lookup".into(),
                best_case: "O(1) cache hit".into(),
                bottlenecks: vec!["Datastore round trips".into()],
            },
        }
    }

    fn generate_architecture(&self, _project: &SparcProject) -> Architecture {
        Architecture {
            components: vec![
                component("ApiGateway", ComponentRole::Gateway, "Terminate TLS and route requests", &[]),
                component("ResourceService", ComponentRole::Service, "Execute resource operations", &["ResourceStore"]),
                component("ResourceStore", ComponentRole::DataManager, "Persist resources", &[]),
            ],
            interfaces: vec![InterfaceDef {
                name: "IResource".into(),
                description: "CRUD operations over a resource".into(),
                operations: vec!["create".into(), "read".into(), "update".into(), "delete".into(), "list".into()],
            }],
            quality_attributes: vec![QualityAttribute {
                name: "availability".into(),
                target: "99.9%".into(),
            }],
            architectural_patterns: vec!["Layered".into()],
            technology_stack: vec!["HTTP".into(), "SQL".into()],
            ..Architecture::default()
        }
    }
}

/// Swarm coordination template.
pub struct SwarmCoordinationTemplate;

impl DomainTemplate for SwarmCoordinationTemplate {
    fn metadata(&self) -> TemplateMetadata {
        TemplateMetadata {
            id: "swarm-coordination".to_string(),
            domain: ProjectDomain::SwarmCoordination,
            complexity: Complexity::High,
            tags: vec!["swarm".into(), "agents".into(), "coordination".into(), "dispatch".into()],
            requirements: vec![
                "Agent registry with capabilities".into(),
                "Capability-aware task dispatch".into(),
                "Topology coordination".into(),
                "Performance tracking".into(),
            ],
            estimated_time_min: 360,
        }
    }

    fn generate_specification(&self, project: &SparcProject) -> Specification {
        Specification {
            functional_requirements: vec![
                fr("FR-1", "Register and remove agents with capability sets", RequirementPriority::High),
                fr("FR-2", "Dispatch tasks to the best-scoring capable agent", RequirementPriority::High)
                    .with_description(format!("Scoring tuned for the {} workload", project.name)),
                fr("FR-3", "Track per-agent performance counters", RequirementPriority::Medium),
                fr("FR-4", "Coordinate agent state across the configured topology", RequirementPriority::Medium),
            ],
            non_functional_requirements: vec![
                nfr("NFR-1", "performance", "Dispatch decision time", "< 5 ms at 1000 agents"),
                nfr("NFR-2", "reliability", "Coordination round success rate", "> 80%"),
            ],
            constraints: project.constraints.clone(),
            assumptions: vec!["Agents are cooperative and report honestly".into()],
            dependencies: vec!["Key-value store".into()],
            acceptance_criteria: vec![
                ac("AC-1", "Dispatch is deterministic given identical registry state", &["FR-2"]),
                ac("AC-2", "Duplicate agent registration is rejected", &["FR-1"]),
            ],
            risk_assessment: RiskAssessment {
                risks: vec![risk("R-1", "Stale agent state skews dispatch", RiskLevel::Medium, RiskLevel::Medium)],
                mitigations: vec!["Periodic coordination rounds refresh state".into()],
                overall_risk: RiskLevel::Medium,
            },
            success_metrics: vec!["Assignment latency within budget".into()],
        }
    }

    fn generate_pseudocode(&self, _project: &SparcProject) -> Pseudocode {
        Pseudocode {
            algorithms: vec![
                Algorithm::new("AssignTask", "Pick the best idle agent for a task")
                    .with_step("Filter idle agents covering the required capabilities")
                    .with_step("Score candidates on completions, errors, and latency")
                    .with_step("Pick the maximum, breaking ties by lowest id")
                    .with_step("Mark the winner busy and record the assignment"),
                Algorithm::new("CoordinateSwarm", "Synchronize agents across a topology")
                    .with_step("Fan out one bounded sync step per agent")
                    .with_step("Collect latencies and failures")
                    .with_step("Derive success rate against the threshold"),
            ],
            data_structures: vec![
                data_structure("AgentRegistry", "map", "Agents keyed by id", &["register", "remove", "claim"]),
                data_structure("AssignmentTable", "map", "In-flight task bindings", &["insert", "remove"]),
            ],
            control_flows: vec![ControlFlow {
                name: "coordination-round".into(),
                flow_type: "parallel".into(),
                description: "independent per-agent sync with no ordering".into(),
            }],
            optimizations: vec!["Ordered registry scan keeps tie-breaks free".into()],
            dependencies: vec!["Event bus".into()],
            complexity_analysis: ComplexityAnalysis {
                time: "O(n) per dispatch over n agents".into(),
                space: "O(n + t) for agents and in-flight tasks".into(),
                scalability: "Sharding the registry by capability".into(),
                worst_case: "O(n) full scan".into(),
                average_case: "O(n)".into(),
                best_case: "O(1) single candidate".into(),
                bottlenecks: vec!["Registry lock under dispatch bursts".into()],
            },
        }
    }

    fn generate_architecture(&self, _project: &SparcProject) -> Architecture {
        Architecture {
            components: vec![
                component("SwarmCoordinator", ComponentRole::Service, "Agent lifecycle and coordination fan-out", &["AgentRegistry"]),
                component("TaskDispatcher", ComponentRole::Service, "Capability-scored assignment", &["AgentRegistry"]),
                component("AgentRegistry", ComponentRole::DataManager, "Authoritative agent store", &[]),
            ],
            interfaces: vec![InterfaceDef {
                name: "IDispatch".into(),
                description: "Assignment and completion".into(),
                operations: vec!["assign".into(), "complete".into()],
            }],
            quality_attributes: vec![QualityAttribute {
                name: "determinism".into(),
                target: "identical inputs produce identical assignments".into(),
            }],
            architectural_patterns: vec!["Event-Driven".into()],
            technology_stack: vec!["Async runtime".into(), "Key-value store".into()],
            ..Architecture::default()
        }
    }
}

/// Neural network pipeline template.
pub struct NeuralNetworksTemplate;

impl DomainTemplate for NeuralNetworksTemplate {
    fn metadata(&self) -> TemplateMetadata {
        TemplateMetadata {
            id: "neural-network-pipeline".to_string(),
            domain: ProjectDomain::NeuralNetworks,
            complexity: Complexity::Complex,
            tags: vec!["neural".into(), "training".into(), "inference".into(), "model".into()],
            requirements: vec![
                "Training pipeline".into(),
                "Inference serving".into(),
                "Model versioning".into(),
            ],
            estimated_time_min: 480,
        }
    }

    fn generate_specification(&self, project: &SparcProject) -> Specification {
        Specification {
            functional_requirements: vec![
                fr("FR-1", "Train models from versioned datasets", RequirementPriority::High),
                fr("FR-2", "Serve inference with bounded latency", RequirementPriority::High),
                fr("FR-3", "Version and roll back models", RequirementPriority::Medium)
                    .with_description(format!("Model lineage tracked per {} deployment", project.name)),
            ],
            non_functional_requirements: vec![
                nfr("NFR-1", "performance", "Inference latency p95", "< 50 ms"),
                nfr("NFR-2", "reproducibility", "Training determinism", "seeded runs match"),
            ],
            constraints: project.constraints.clone(),
            assumptions: vec!["Accelerator capacity is provisioned".into()],
            dependencies: vec!["Feature store".into(), "Artifact registry".into()],
            acceptance_criteria: vec![
                ac("AC-1", "A training run produces a registered, versioned model", &["FR-1", "FR-3"]),
                ac("AC-2", "Inference meets the latency target at nominal QPS", &["FR-2"]),
            ],
            risk_assessment: RiskAssessment {
                risks: vec![risk("R-1", "Training/serving skew", RiskLevel::High, RiskLevel::High)],
                mitigations: vec!["Share feature transforms between paths".into()],
                overall_risk: RiskLevel::High,
            },
            success_metrics: vec!["Offline metrics reproduce online within tolerance".into()],
        }
    }

    fn generate_pseudocode(&self, _project: &SparcProject) -> Pseudocode {
        Pseudocode {
            algorithms: vec![
                Algorithm::new("TrainEpoch", "One pass over the training set")
                    .with_step("Stream batches from the dataset")
                    .with_step("Forward, compute loss, backward")
                    .with_step("Step the optimizer and log metrics"),
                Algorithm::new("ServeInference", "Answer one inference request")
                    .with_step("Resolve the pinned model version")
                    .with_step("Apply feature transforms")
                    .with_step("Run the forward pass and return scores"),
            ],
            data_structures: vec![
                data_structure("ModelRegistry", "map", "Versioned model artifacts", &["publish", "resolve", "rollback"]),
            ],
            control_flows: vec![ControlFlow {
                name: "training-loop".into(),
                flow_type: "loop".into(),
                description: "epochs until early-stopping criterion".into(),
            }],
            optimizations: vec!["Batch inference requests".into()],
            dependencies: vec!["Tensor runtime".into()],
            complexity_analysis: ComplexityAnalysis {
                time: "O(epochs * |dataset|)".into(),
                space: "O(parameters)".into(),
                scalability: "Data-parallel workers".into(),
                worst_case: "O(epochs * |dataset|)".into(),
                average_case: "O(epochs * |dataset|)".into(),
                best_case: "O(|dataset|) single epoch".into(),
                bottlenecks: vec!["Accelerator memory bandwidth".into()],
            },
        }
    }

    fn generate_architecture(&self, _project: &SparcProject) -> Architecture {
        Architecture {
            components: vec![
                component("TrainingPipeline", ComponentRole::Service, "Produce versioned models", &["ModelStore"]),
                component("InferenceService", ComponentRole::Service, "Low-latency scoring", &["ModelStore"]),
                component("ModelStore", ComponentRole::DataManager, "Versioned model artifacts", &[]),
            ],
            interfaces: vec![InterfaceDef {
                name: "IInference".into(),
                description: "Scoring over deployed models".into(),
                operations: vec!["predict".into()],
            }],
            quality_attributes: vec![QualityAttribute {
                name: "latency".into(),
                target: "p95 < 50 ms".into(),
            }],
            architectural_patterns: vec!["Pipeline".into()],
            technology_stack: vec!["Tensor runtime".into(), "Object storage".into()],
            ..Architecture::default()
        }
    }
}

/// Memory/storage systems template.
pub struct MemorySystemsTemplate;

impl DomainTemplate for MemorySystemsTemplate {
    fn metadata(&self) -> TemplateMetadata {
        TemplateMetadata {
            id: "memory-system".to_string(),
            domain: ProjectDomain::MemorySystems,
            complexity: Complexity::Moderate,
            tags: vec!["memory".into(), "storage".into(), "cache".into(), "persistence".into()],
            requirements: vec![
                "Namespaced key-value persistence".into(),
                "Pattern search".into(),
                "Atomic writes".into(),
            ],
            estimated_time_min: 180,
        }
    }

    fn generate_specification(&self, project: &SparcProject) -> Specification {
        Specification {
            functional_requirements: vec![
                fr("FR-1", "Store and retrieve values by namespaced key", RequirementPriority::High),
                fr("FR-2", "Search keys by pattern within a namespace", RequirementPriority::Medium),
                fr("FR-3", "Report aggregate statistics", RequirementPriority::Low)
                    .with_description(format!("Operators inspect {} storage growth", project.name)),
            ],
            non_functional_requirements: vec![
                nfr("NFR-1", "durability", "Committed writes survive restart", "always"),
                nfr("NFR-2", "consistency", "Readers never observe partial writes", "always"),
            ],
            constraints: project.constraints.clone(),
            assumptions: vec!["Values fit in memory during a rewrite".into()],
            dependencies: vec!["Filesystem or embedded database".into()],
            acceptance_criteria: vec![
                ac("AC-1", "store followed by retrieve returns the stored value", &["FR-1"]),
                ac("AC-2", "A crashed write leaves the prior value intact", &["FR-1"]),
            ],
            risk_assessment: RiskAssessment {
                risks: vec![risk("R-1", "Whole-file rewrite cost grows with namespace size", RiskLevel::Medium, RiskLevel::Low)],
                mitigations: vec!["Cap namespace file size".into()],
                overall_risk: RiskLevel::Low,
            },
            success_metrics: vec!["Round-trip property holds under concurrent writers".into()],
        }
    }

    fn generate_pseudocode(&self, _project: &SparcProject) -> Pseudocode {
        Pseudocode {
            algorithms: vec![
                Algorithm::new("AtomicStore", "Write one key without exposing partial state")
                    .with_step("Read the namespace into memory")
                    .with_step("Apply the mutation")
                    .with_step("Write a temp file and rename over the original"),
                Algorithm::new("PatternSearch", "Find keys matching a pattern")
                    .with_step("Treat * as match-all")
                    .with_step("Otherwise match the pattern as a substring"),
            ],
            data_structures: vec![
                data_structure("NamespaceMap", "map", "Entries of one namespace", &["get", "insert", "remove"]),
            ],
            control_flows: vec![ControlFlow {
                name: "write-path".into(),
                flow_type: "sequential".into(),
                description: "read -> mutate -> temp write -> rename".into(),
            }],
            optimizations: vec!["Serialize writes per namespace".into()],
            dependencies: vec![],
            complexity_analysis: ComplexityAnalysis {
                time: "O(|namespace|) per write".into(),
                space: "O(|namespace|)".into(),
                scalability: "Partition by namespace".into(),
                worst_case: "O(|namespace|)".into(),
                average_case: "O(|namespace|)".into(),
                best_case: "O(1) read".into(),
                bottlenecks: vec!["Rewrite amplification".into()],
            },
        }
    }

    fn generate_architecture(&self, _project: &SparcProject) -> Architecture {
        Architecture {
            components: vec![
                component("KvService", ComponentRole::Service, "Namespaced KV operations", &["NamespaceStore"]),
                component("NamespaceStore", ComponentRole::DataManager, "Per-namespace persistence", &[]),
            ],
            interfaces: vec![InterfaceDef {
                name: "IKvStore".into(),
                description: "store/retrieve/search/delete/stats".into(),
                operations: vec!["store".into(), "retrieve".into(), "search".into(), "delete".into(), "stats".into()],
            }],
            quality_attributes: vec![QualityAttribute {
                name: "durability".into(),
                target: "no partial writes observable".into(),
            }],
            architectural_patterns: vec!["Repository".into()],
            technology_stack: vec!["Embedded database".into()],
            ..Architecture::default()
        }
    }
}

/// Fallback template for the general domain.
pub struct GeneralTemplate;

impl DomainTemplate for GeneralTemplate {
    fn metadata(&self) -> TemplateMetadata {
        TemplateMetadata {
            id: "general-project".to_string(),
            domain: ProjectDomain::General,
            complexity: Complexity::Simple,
            tags: vec!["general".into(), "baseline".into()],
            requirements: vec!["Core feature delivery".into(), "Basic testing".into()],
            estimated_time_min: 120,
        }
    }

    fn generate_specification(&self, project: &SparcProject) -> Specification {
        Specification {
            functional_requirements: project
                .requirements
                .iter()
                .enumerate()
                .map(|(i, r)| fr(&format!("FR-{}", i + 1), r, RequirementPriority::High))
                .collect(),
            non_functional_requirements: vec![nfr(
                "NFR-1",
                "maintainability",
                "Code review coverage",
                "all changes reviewed",
            )],
            constraints: project.constraints.clone(),
            assumptions: vec![],
            dependencies: vec![],
            acceptance_criteria: project
                .requirements
                .iter()
                .enumerate()
                .map(|(i, r)| {
                    ac(
                        &format!("AC-{}", i + 1),
                        &format!("'{r}' is demonstrably satisfied"),
                        &[&format!("FR-{}", i + 1)],
                    )
                })
                .collect(),
            risk_assessment: RiskAssessment::default(),
            success_metrics: vec!["All acceptance criteria pass".into()],
        }
    }

    fn generate_pseudocode(&self, project: &SparcProject) -> Pseudocode {
        Pseudocode {
            algorithms: project
                .requirements
                .iter()
                .map(|r| {
                    Algorithm::new(format!("Deliver: {r}"), "Satisfy one requirement")
                        .with_step("Design the change")
                        .with_step("Implement the change")
                        .with_step("Verify against the acceptance criterion")
                })
                .collect(),
            data_structures: vec![],
            control_flows: vec![],
            optimizations: vec![],
            dependencies: vec![],
            complexity_analysis: ComplexityAnalysis::default(),
        }
    }

    fn generate_architecture(&self, project: &SparcProject) -> Architecture {
        Architecture {
            components: vec![component(
                &format!("{}Core", project.name.replace(' ', "")),
                ComponentRole::Service,
                "Core application logic",
                &[],
            )],
            architectural_patterns: vec!["Layered".into()],
            ..Architecture::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(domain: ProjectDomain, complexity: Complexity, reqs: &[&str]) -> SparcProject {
        SparcProject::new("Demo", domain)
            .with_complexity(complexity)
            .with_requirements(reqs.iter().copied())
    }

    #[tokio::test]
    async fn test_find_best_matches_domain() {
        let registry = TemplateRegistry::with_builtins();
        let project = project(
            ProjectDomain::RestApi,
            Complexity::Moderate,
            &["CRUD resource endpoints"],
        );

        let (id, score) = registry.find_best(&project).await.unwrap();
        assert_eq!(id, "rest-api-service");
        assert!(score.is_compatible());
        assert!(score.requirement_coverage > 0.99);
    }

    #[tokio::test]
    async fn test_incompatible_when_nothing_fits() {
        let registry = TemplateRegistry::with_builtins();
        // WASM domain has no builtin template; mismatched domains score 0.4
        // plus weak coverage and stay below the threshold.
        let project = project(
            ProjectDomain::WasmIntegration,
            Complexity::Moderate,
            &["sandboxed plugin host"],
        );
        assert!(registry.find_best(&project).await.is_none());
    }

    #[test]
    fn test_score_monotone_in_coverage() {
        let template = RestApiTemplate.metadata();
        let low = project(ProjectDomain::RestApi, Complexity::Moderate, &["quantum entanglement"]);
        let high = project(ProjectDomain::RestApi, Complexity::Moderate, &["CRUD resource endpoints"]);

        let low_score = TemplateRegistry::score(&template, &low);
        let high_score = TemplateRegistry::score(&template, &high);
        assert!(high_score.requirement_coverage > low_score.requirement_coverage);
        assert!(high_score.score > low_score.score);
    }

    #[test]
    fn test_complexity_penalties() {
        let heavy = SwarmCoordinationTemplate.metadata();
        let simple_project = project(ProjectDomain::SwarmCoordination, Complexity::Simple, &[]);
        let aligned_project = project(ProjectDomain::SwarmCoordination, Complexity::High, &[]);

        let penalized = TemplateRegistry::score(&heavy, &simple_project);
        let aligned = TemplateRegistry::score(&heavy, &aligned_project);
        assert!((aligned.score - penalized.score - 0.2).abs() < 1e-9);

        let simple_template = GeneralTemplate.metadata();
        let enterprise_project = project(ProjectDomain::General, Complexity::Enterprise, &[]);
        let plain_project = project(ProjectDomain::General, Complexity::Simple, &[]);
        let penalized = TemplateRegistry::score(&simple_template, &enterprise_project);
        let aligned = TemplateRegistry::score(&simple_template, &plain_project);
        assert!((aligned.score - penalized.score - 0.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_apply_updates_usage_and_is_repeatable() {
        let registry = TemplateRegistry::with_builtins();
        let project = project(
            ProjectDomain::RestApi,
            Complexity::Moderate,
            &["CRUD resource endpoints"],
        );

        let first = registry.apply("rest-api-service", &project).await.unwrap();
        let second = registry.apply("rest-api-service", &project).await.unwrap();
        // Identical inputs produce identical deliverable structures.
        assert_eq!(first.specification, second.specification);
        assert_eq!(first.pseudocode, second.pseudocode);
        assert_eq!(first.architecture, second.architecture);

        let list = registry.list().await;
        let (_, usage) = list
            .iter()
            .find(|(m, _)| m.id == "rest-api-service")
            .unwrap();
        assert_eq!(usage.usage_count, 2);
    }

    #[tokio::test]
    async fn test_apply_unknown_template() {
        let registry = TemplateRegistry::with_builtins();
        let project = project(ProjectDomain::General, Complexity::Simple, &[]);
        assert!(matches!(
            registry.apply("missing", &project).await.unwrap_err(),
            DomainError::TemplateNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_rating() {
        let registry = TemplateRegistry::with_builtins();
        let avg = registry.rate("general-project", 4.0).await.unwrap();
        assert!((avg - 4.0).abs() < f64::EPSILON);
        let avg = registry.rate("general-project", 2.0).await.unwrap();
        assert!((avg - 3.0).abs() < f64::EPSILON);
    }
}

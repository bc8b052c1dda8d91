//! SPARC project domain model.
//!
//! A project moves through the five canonical phases in order. Progress
//! bookkeeping maintains two invariants: `completed_phases` is always a
//! prefix of the canonical order, and `overall_progress` equals
//! `completed / 5`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::artifacts::{Architecture, Implementation, Pseudocode, Refinement, Specification};

/// Closed set of project domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectDomain {
    SwarmCoordination,
    NeuralNetworks,
    MemorySystems,
    RestApi,
    WasmIntegration,
    Interfaces,
    General,
}

impl Default for ProjectDomain {
    fn default() -> Self {
        Self::General
    }
}

impl ProjectDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SwarmCoordination => "swarm-coordination",
            Self::NeuralNetworks => "neural-networks",
            Self::MemorySystems => "memory-systems",
            Self::RestApi => "rest-api",
            Self::WasmIntegration => "wasm-integration",
            Self::Interfaces => "interfaces",
            Self::General => "general",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "swarm-coordination" => Some(Self::SwarmCoordination),
            "neural-networks" => Some(Self::NeuralNetworks),
            "memory-systems" => Some(Self::MemorySystems),
            "rest-api" => Some(Self::RestApi),
            "wasm-integration" => Some(Self::WasmIntegration),
            "interfaces" => Some(Self::Interfaces),
            "general" => Some(Self::General),
            _ => None,
        }
    }
}

/// Project complexity classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Moderate,
    High,
    Complex,
    Enterprise,
}

impl Default for Complexity {
    fn default() -> Self {
        Self::Moderate
    }
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Complex => "complex",
            Self::Enterprise => "enterprise",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "simple" => Some(Self::Simple),
            "moderate" => Some(Self::Moderate),
            "high" => Some(Self::High),
            "complex" => Some(Self::Complex),
            "enterprise" => Some(Self::Enterprise),
            _ => None,
        }
    }
}

/// The five canonical phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SparcPhase {
    Specification,
    Pseudocode,
    Architecture,
    Refinement,
    Completion,
}

impl SparcPhase {
    /// Canonical execution order.
    pub const CANONICAL_ORDER: [SparcPhase; 5] = [
        Self::Specification,
        Self::Pseudocode,
        Self::Architecture,
        Self::Refinement,
        Self::Completion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Specification => "specification",
            Self::Pseudocode => "pseudocode",
            Self::Architecture => "architecture",
            Self::Refinement => "refinement",
            Self::Completion => "completion",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "specification" => Some(Self::Specification),
            "pseudocode" => Some(Self::Pseudocode),
            "architecture" => Some(Self::Architecture),
            "refinement" => Some(Self::Refinement),
            "completion" => Some(Self::Completion),
            _ => None,
        }
    }

    /// Zero-based position in the canonical order.
    pub fn index(&self) -> usize {
        Self::CANONICAL_ORDER
            .iter()
            .position(|p| p == self)
            .expect("phase is in canonical order")
    }

    /// The phase after this one, if any.
    pub fn next(&self) -> Option<SparcPhase> {
        Self::CANONICAL_ORDER.get(self.index() + 1).copied()
    }

    /// The phase before this one, if any.
    pub fn previous(&self) -> Option<SparcPhase> {
        self.index().checked_sub(1).map(|i| Self::CANONICAL_ORDER[i])
    }
}

impl std::fmt::Display for SparcPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Execution status of one phase within a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseExecutionStatus {
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

impl Default for PhaseExecutionStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

/// Outcome of a single validation criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub criterion: String,
    pub passed: bool,
    /// Score in [0, 1].
    pub score: f64,
    pub details: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
}

impl ValidationResult {
    pub fn passed(criterion: impl Into<String>, score: f64, details: impl Into<String>) -> Self {
        Self {
            criterion: criterion.into(),
            passed: true,
            score,
            details: details.into(),
            recommendations: Vec::new(),
        }
    }

    pub fn failed(
        criterion: impl Into<String>,
        score: f64,
        details: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            criterion: criterion.into(),
            passed: false,
            score,
            details: details.into(),
            recommendations: vec![recommendation.into()],
        }
    }
}

/// A named artifact record produced by a phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deliverable {
    pub id: Uuid,
    pub name: String,
    /// Deliverable kind label (e.g. "specification", "component-diagram").
    pub kind: String,
    pub produced_by: SparcPhase,
    pub created_at: DateTime<Utc>,
}

impl Deliverable {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, phase: SparcPhase) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind: kind.into(),
            produced_by: phase,
            created_at: Utc::now(),
        }
    }
}

/// Per-phase execution bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseState {
    pub status: PhaseExecutionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_min: f64,
    /// Ids of deliverables produced by the phase.
    pub deliverables: Vec<Uuid>,
    pub validation_results: Vec<ValidationResult>,
}

/// Progress across the five phases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectProgress {
    /// Completed phases, always a prefix of the canonical order.
    pub completed_phases: Vec<SparcPhase>,
    pub phase_status: HashMap<SparcPhase, PhaseState>,
    /// `completed_phases.len() / 5`.
    pub overall_progress: f64,
}

impl ProjectProgress {
    /// Mark a phase as started.
    pub fn record_started(&mut self, phase: SparcPhase) {
        let state = self.phase_status.entry(phase).or_default();
        state.status = PhaseExecutionStatus::InProgress;
        state.started_at = Some(Utc::now());
    }

    /// Mark a phase as completed and fold it into the prefix.
    pub fn record_completed(&mut self, phase: SparcPhase, state: PhaseState) {
        self.phase_status.insert(phase, state);
        if !self.completed_phases.contains(&phase) {
            self.completed_phases.push(phase);
        }
        self.overall_progress =
            self.completed_phases.len() as f64 / SparcPhase::CANONICAL_ORDER.len() as f64;
    }

    /// Mark a phase as failed with the given validation results.
    pub fn record_failed(&mut self, phase: SparcPhase, results: Vec<ValidationResult>) {
        let state = self.phase_status.entry(phase).or_default();
        state.status = PhaseExecutionStatus::Failed;
        state.completed_at = Some(Utc::now());
        state.validation_results = results;
    }

    /// Whether `completed_phases` is a prefix of the canonical order.
    pub fn is_canonical_prefix(&self) -> bool {
        self.completed_phases
            .iter()
            .zip(SparcPhase::CANONICAL_ORDER.iter())
            .all(|(a, b)| a == b)
            && self.completed_phases.len() <= SparcPhase::CANONICAL_ORDER.len()
    }

    /// Status of one phase, defaulting to not-started.
    pub fn status_of(&self, phase: SparcPhase) -> PhaseExecutionStatus {
        self.phase_status
            .get(&phase)
            .map(|s| s.status)
            .unwrap_or_default()
    }
}

/// A SPARC project and its accumulated phase products.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparcProject {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub domain: ProjectDomain,
    pub complexity: Complexity,
    pub requirements: Vec<String>,
    pub constraints: Vec<String>,
    pub current_phase: SparcPhase,
    pub specification: Option<Specification>,
    pub pseudocode: Option<Pseudocode>,
    pub architecture: Option<Architecture>,
    pub refinements: Vec<Refinement>,
    pub implementation: Option<Implementation>,
    pub progress: ProjectProgress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SparcProject {
    pub fn new(name: impl Into<String>, domain: ProjectDomain) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            domain,
            complexity: Complexity::default(),
            requirements: Vec::new(),
            constraints: Vec::new(),
            current_phase: SparcPhase::Specification,
            specification: None,
            pseudocode: None,
            architecture: None,
            refinements: Vec::new(),
            implementation: None,
            progress: ProjectProgress::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_requirements<I, S>(mut self, reqs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requirements.extend(reqs.into_iter().map(Into::into));
        self
    }

    pub fn with_constraints<I, S>(mut self, constraints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraints
            .extend(constraints.into_iter().map(Into::into));
        self
    }

    /// The latest refined architecture, falling back to the base one.
    pub fn effective_architecture(&self) -> Option<&Architecture> {
        self.refinements
            .last()
            .map(|r| &r.refined_architecture)
            .or(self.architecture.as_ref())
    }

    /// Whether every phase has completed.
    pub fn is_complete(&self) -> bool {
        self.progress.completed_phases.len() == SparcPhase::CANONICAL_ORDER.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order() {
        assert_eq!(SparcPhase::Specification.index(), 0);
        assert_eq!(SparcPhase::Completion.index(), 4);
        assert_eq!(SparcPhase::Specification.next(), Some(SparcPhase::Pseudocode));
        assert_eq!(SparcPhase::Completion.next(), None);
        assert_eq!(SparcPhase::Pseudocode.previous(), Some(SparcPhase::Specification));
        assert_eq!(SparcPhase::Specification.previous(), None);
    }

    #[test]
    fn test_progress_prefix_invariant() {
        let mut progress = ProjectProgress::default();
        assert!(progress.is_canonical_prefix());

        progress.record_completed(SparcPhase::Specification, PhaseState::default());
        assert!(progress.is_canonical_prefix());
        assert!((progress.overall_progress - 0.2).abs() < f64::EPSILON);

        progress.record_completed(SparcPhase::Pseudocode, PhaseState::default());
        assert!(progress.is_canonical_prefix());
        assert!((progress.overall_progress - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn test_progress_out_of_order_detected() {
        let mut progress = ProjectProgress::default();
        progress.record_completed(SparcPhase::Architecture, PhaseState::default());
        assert!(!progress.is_canonical_prefix());
    }

    #[test]
    fn test_record_completed_idempotent() {
        let mut progress = ProjectProgress::default();
        progress.record_completed(SparcPhase::Specification, PhaseState::default());
        progress.record_completed(SparcPhase::Specification, PhaseState::default());
        assert_eq!(progress.completed_phases.len(), 1);
        assert!((progress.overall_progress - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_domain_round_trip() {
        for d in [
            ProjectDomain::SwarmCoordination,
            ProjectDomain::RestApi,
            ProjectDomain::General,
        ] {
            assert_eq!(ProjectDomain::parse_str(d.as_str()), Some(d));
        }
        assert_eq!(ProjectDomain::parse_str("blockchain"), None);
    }

    #[test]
    fn test_project_builder() {
        let project = SparcProject::new("DemoAPI", ProjectDomain::RestApi)
            .with_description("CRUD service")
            .with_complexity(Complexity::Moderate)
            .with_requirements(["CRUD users"]);

        assert_eq!(project.current_phase, SparcPhase::Specification);
        assert!(!project.is_complete());
        assert!(project.effective_architecture().is_none());
        assert_eq!(project.requirements, vec!["CRUD users".to_string()]);
    }
}

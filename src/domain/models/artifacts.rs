//! Phase artifact payloads.
//!
//! Each SPARC phase produces one of these payloads. They are records that
//! describe artifacts — specifications, algorithms, components, optimization
//! plans, implementation file records — not compiled output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Specification
// ============================================================================

/// Priority of a functional requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementPriority {
    Low,
    Medium,
    High,
}

impl Default for RequirementPriority {
    fn default() -> Self {
        Self::Medium
    }
}

/// A functional requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionalRequirement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: RequirementPriority,
}

impl FunctionalRequirement {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            priority: RequirementPriority::default(),
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn with_priority(mut self, priority: RequirementPriority) -> Self {
        self.priority = priority;
        self
    }
}

/// A non-functional requirement with a measurable target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonFunctionalRequirement {
    pub id: String,
    /// Category such as "performance", "security", "reliability".
    pub category: String,
    pub description: String,
    pub target: String,
}

/// An acceptance criterion, optionally covering specific requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptanceCriterion {
    pub id: String,
    pub description: String,
    /// Functional requirement ids this criterion covers.
    pub covers: Vec<String>,
}

/// Overall risk level of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl Default for RiskLevel {
    fn default() -> Self {
        Self::Low
    }
}

/// A single identified risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub id: String,
    pub description: String,
    pub likelihood: RiskLevel,
    pub impact: RiskLevel,
}

/// Risk assessment for a specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risks: Vec<Risk>,
    pub mitigations: Vec<String>,
    pub overall_risk: RiskLevel,
}

impl Default for RiskAssessment {
    fn default() -> Self {
        Self {
            risks: Vec::new(),
            mitigations: Vec::new(),
            overall_risk: RiskLevel::Low,
        }
    }
}

/// Product of the specification phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    pub functional_requirements: Vec<FunctionalRequirement>,
    pub non_functional_requirements: Vec<NonFunctionalRequirement>,
    pub constraints: Vec<String>,
    pub assumptions: Vec<String>,
    pub dependencies: Vec<String>,
    pub acceptance_criteria: Vec<AcceptanceCriterion>,
    pub risk_assessment: RiskAssessment,
    pub success_metrics: Vec<String>,
}

// ============================================================================
// Pseudocode
// ============================================================================

/// A parameter of an algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    pub name: String,
    pub type_name: String,
    pub description: String,
}

/// Return definition of an algorithm.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnDef {
    pub type_name: String,
    pub description: String,
}

/// One numbered step of an algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmStep {
    pub number: u32,
    pub description: String,
}

/// Local complexity summary for one algorithm.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplexitySummary {
    pub time: String,
    pub space: String,
}

/// A described algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Algorithm {
    pub name: String,
    pub purpose: String,
    pub steps: Vec<AlgorithmStep>,
    pub parameters: Vec<ParameterDef>,
    pub returns: ReturnDef,
    pub complexity: ComplexitySummary,
    /// Names of other algorithms or data structures this one relies on.
    pub dependencies: Vec<String>,
}

impl Algorithm {
    pub fn new(name: impl Into<String>, purpose: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            purpose: purpose.into(),
            steps: Vec::new(),
            parameters: Vec::new(),
            returns: ReturnDef::default(),
            complexity: ComplexitySummary::default(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_step(mut self, description: impl Into<String>) -> Self {
        let number = self.steps.len() as u32 + 1;
        self.steps.push(AlgorithmStep {
            number,
            description: description.into(),
        });
        self
    }
}

/// A described data structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataStructureDef {
    pub name: String,
    /// Kind such as "map", "queue", "graph", "record".
    pub kind: String,
    pub purpose: String,
    pub operations: Vec<String>,
}

/// A described control flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlFlow {
    pub name: String,
    /// Flow type such as "sequential", "branch", "loop", "parallel".
    pub flow_type: String,
    pub description: String,
}

/// Whole-design complexity analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplexityAnalysis {
    pub time: String,
    pub space: String,
    pub scalability: String,
    pub worst_case: String,
    pub average_case: String,
    pub best_case: String,
    pub bottlenecks: Vec<String>,
}

/// Product of the pseudocode phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pseudocode {
    pub algorithms: Vec<Algorithm>,
    pub data_structures: Vec<DataStructureDef>,
    pub control_flows: Vec<ControlFlow>,
    pub optimizations: Vec<String>,
    pub dependencies: Vec<String>,
    pub complexity_analysis: ComplexityAnalysis,
}

// ============================================================================
// Architecture
// ============================================================================

/// Role a component plays in the architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentRole {
    /// Derived from an algorithm.
    Service,
    /// Derived from a data structure.
    DataManager,
    /// Fixed infrastructure: API gateway.
    Gateway,
    /// Fixed infrastructure: configuration manager.
    Configuration,
    /// Fixed infrastructure: monitoring.
    Monitoring,
}

impl ComponentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::DataManager => "data_manager",
            Self::Gateway => "gateway",
            Self::Configuration => "configuration",
            Self::Monitoring => "monitoring",
        }
    }
}

/// An architectural component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub name: String,
    pub role: ComponentRole,
    pub responsibility: String,
    /// Names of components or interfaces this component depends on.
    pub dependencies: Vec<String>,
    /// Interfaces this component provides.
    pub provided_interfaces: Vec<String>,
    /// Latency target in milliseconds; refinement tightens this.
    pub latency_target_ms: Option<f64>,
}

/// A declared interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDef {
    pub name: String,
    pub description: String,
    pub operations: Vec<String>,
}

/// A directed relationship between two components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub from: String,
    pub to: String,
    /// Relation label such as "uses", "stores", "exposes".
    pub relation: String,
}

/// A data flow derived from a relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFlow {
    pub from: String,
    pub to: String,
    pub data_type: String,
    pub protocol: String,
    pub frequency: String,
}

/// A deployment unit grouping components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentUnit {
    pub name: String,
    pub components: Vec<String>,
    pub replicas: u32,
}

/// A quality attribute with its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAttribute {
    pub name: String,
    pub target: String,
}

/// Product of the architecture phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    pub components: Vec<Component>,
    pub interfaces: Vec<InterfaceDef>,
    pub relationships: Vec<Relationship>,
    pub data_flow: Vec<DataFlow>,
    pub deployment_units: Vec<DeploymentUnit>,
    pub quality_attributes: Vec<QualityAttribute>,
    pub architectural_patterns: Vec<String>,
    pub technology_stack: Vec<String>,
    pub security_requirements: Vec<String>,
    pub scalability_requirements: Vec<String>,
}

impl Architecture {
    /// Look up a component by name.
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Look up a component by name, mutably.
    pub fn component_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.name == name)
    }

    /// Whether an interface with the given name is defined.
    pub fn has_interface(&self, name: &str) -> bool {
        self.interfaces.iter().any(|i| i.name == name)
    }
}

// ============================================================================
// Refinement
// ============================================================================

/// Category of an optimization effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationCategory {
    Performance,
    Security,
    Scalability,
    CodeQuality,
}

impl OptimizationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Performance => "performance",
            Self::Security => "security",
            Self::Scalability => "scalability",
            Self::CodeQuality => "code_quality",
        }
    }

    /// Priority assigned to strategies in this category.
    pub fn strategy_priority(&self) -> OptimizationPriority {
        match self {
            Self::Security => OptimizationPriority::Critical,
            Self::Performance | Self::Scalability => OptimizationPriority::High,
            Self::CodeQuality => OptimizationPriority::Medium,
        }
    }
}

/// Priority of an optimization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptimizationPriority {
    Medium,
    High,
    Critical,
}

/// A selected optimization strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationStrategy {
    pub category: OptimizationCategory,
    pub priority: OptimizationPriority,
    pub description: String,
    pub actions: Vec<String>,
}

/// One concrete optimization applied to the architecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Optimization {
    pub category: OptimizationCategory,
    /// Component name or area the optimization targets.
    pub target: String,
    pub description: String,
    pub expected_improvement: String,
}

/// Benchmark comparison produced by a refinement iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub name: String,
    pub baseline: f64,
    pub improved: f64,
    pub unit: String,
}

/// Before/after metric recorded by a refinement iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementMetric {
    pub name: String,
    pub before: f64,
    pub after: f64,
}

/// Feedback driving a refinement iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefinementFeedback {
    pub performance_issues: Vec<String>,
    pub security_issues: Vec<String>,
    pub scalability_issues: Vec<String>,
    pub code_quality_issues: Vec<String>,
}

impl RefinementFeedback {
    pub fn is_empty(&self) -> bool {
        self.performance_issues.is_empty()
            && self.security_issues.is_empty()
            && self.scalability_issues.is_empty()
            && self.code_quality_issues.is_empty()
    }
}

/// Product of one refinement iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refinement {
    pub iteration: u32,
    pub optimization_strategies: Vec<OptimizationStrategy>,
    pub performance_optimizations: Vec<Optimization>,
    pub security_optimizations: Vec<Optimization>,
    pub scalability_optimizations: Vec<Optimization>,
    pub code_quality_optimizations: Vec<Optimization>,
    pub refined_architecture: Architecture,
    pub benchmark_results: Vec<BenchmarkResult>,
    pub improvement_metrics: Vec<ImprovementMetric>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Implementation (completion phase)
// ============================================================================

/// Kind of a produced artifact record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    SourceCode,
    TestSuite,
    Documentation,
    Configuration,
    DeploymentScript,
    MonitoringDashboard,
    SecurityConfiguration,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SourceCode => "source_code",
            Self::TestSuite => "test_suite",
            Self::Documentation => "documentation",
            Self::Configuration => "configuration",
            Self::DeploymentScript => "deployment_script",
            Self::MonitoringDashboard => "monitoring_dashboard",
            Self::SecurityConfiguration => "security_configuration",
        }
    }
}

/// Record describing a produced file artifact (not compiled output).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeArtifact {
    pub path: String,
    pub language: String,
    pub kind: ArtifactKind,
    pub description: String,
    pub dependencies: Vec<String>,
}

/// Record describing a produced test suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuiteRecord {
    pub name: String,
    pub path: String,
    /// Line coverage percentage (0..=100).
    pub coverage_lines: f64,
    pub case_count: u32,
}

/// One production readiness check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessCheck {
    pub name: String,
    /// Score 0..=100.
    pub score: f64,
    pub details: String,
}

/// Product of the completion phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Implementation {
    pub source_code: Vec<CodeArtifact>,
    pub test_suites: Vec<TestSuiteRecord>,
    pub documentation: Vec<CodeArtifact>,
    pub configuration_files: Vec<CodeArtifact>,
    pub deployment_scripts: Vec<CodeArtifact>,
    pub monitoring_dashboards: Vec<CodeArtifact>,
    pub security_configurations: Vec<CodeArtifact>,
    pub readiness_checks: Vec<ReadinessCheck>,
}

impl Implementation {
    /// Average readiness score over all checks, 0 when none exist.
    pub fn readiness_average(&self) -> f64 {
        if self.readiness_checks.is_empty() {
            return 0.0;
        }
        self.readiness_checks.iter().map(|c| c.score).sum::<f64>()
            / self.readiness_checks.len() as f64
    }

    /// Minimum test coverage over all suites, 0 when none exist.
    pub fn min_coverage(&self) -> f64 {
        self.test_suites
            .iter()
            .map(|s| s.coverage_lines)
            .fold(None::<f64>, |acc, c| Some(acc.map_or(c, |a| a.min(c))))
            .unwrap_or(0.0)
    }
}

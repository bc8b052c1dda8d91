//! Workflow domain models.
//!
//! A `WorkflowDefinition` is an immutable ordered list of steps; a `Workflow`
//! is the mutable runtime state of one execution. Steps may carry a gate,
//! which pauses the workflow until an external approval arrives.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ============================================================================
// Definitions
// ============================================================================

/// Approval gate attached to a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Gate type label (e.g. "approval", "review").
    #[serde(default)]
    pub gate_type: String,
    /// Business impact statement shown to approvers.
    #[serde(default)]
    pub business_impact: String,
    /// Stakeholders expected to decide.
    #[serde(default)]
    pub stakeholders: Vec<String>,
    /// When true the gate approves immediately without pausing.
    #[serde(default)]
    pub auto_approval: bool,
    /// Optional decision timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Definition of a single workflow step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Handler type this step dispatches to.
    pub step_type: String,
    /// Optional human-readable step name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Handler parameters.
    #[serde(default)]
    pub params: Value,
    /// Per-step deadline in milliseconds; engine default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Optional approval gate evaluated before the handler runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<GateConfig>,
}

impl StepDefinition {
    pub fn new(step_type: impl Into<String>) -> Self {
        Self {
            step_type: step_type.into(),
            name: None,
            params: Value::Null,
            timeout_ms: None,
            gate: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_gate(mut self, gate: GateConfig) -> Self {
        self.gate = Some(gate);
        self
    }
}

/// An immutable, named, ordered list of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Definition name, unique within the engine registry.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Definition version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Ordered steps.
    pub steps: Vec<StepDefinition>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl WorkflowDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            version: default_version(),
            steps: Vec::new(),
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn with_step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Workflow definition name cannot be empty".to_string());
        }
        if self.steps.is_empty() {
            return Err("Workflow definition must have at least one step".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Gates
// ============================================================================

/// A gate decision request constructed when a gated step is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateRequest {
    /// Unique gate identifier.
    pub gate_id: String,
    /// Index of the gated step.
    pub step_index: usize,
    /// Step name or type for display.
    pub step_label: String,
    /// Workflow context snapshot at request time.
    pub workflow_context: HashMap<String, Value>,
    /// Business impact statement from the gate config.
    pub business_impact: String,
    /// Stakeholders expected to decide.
    pub stakeholders: Vec<String>,
    /// Optional decision timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// When the request was raised.
    pub requested_at: DateTime<Utc>,
}

/// Recorded outcome of a gate decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    pub gate_id: String,
    pub approved: bool,
    /// Whether the decision came from auto-approval.
    pub auto: bool,
    pub decided_at: DateTime<Utc>,
}

/// Bookkeeping for a workflow paused on a gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PausedGate {
    pub step_index: usize,
    pub gate_id: String,
    pub paused_at: DateTime<Utc>,
}

// ============================================================================
// Workflow Instance
// ============================================================================

/// Status of a workflow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Created, execution not yet begun.
    Pending,
    /// Executing steps.
    Running,
    /// Held on a gate awaiting an external decision.
    Paused,
    /// All steps completed.
    Completed,
    /// A step or gate failed.
    Failed,
    /// Cancelled by a control operation.
    Cancelled,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Mutable runtime state of a workflow execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique instance identifier.
    pub id: Uuid,
    /// The definition being executed.
    pub definition: WorkflowDefinition,
    /// Current status.
    pub status: WorkflowStatus,
    /// Opaque execution context shared with handlers.
    pub context: HashMap<String, Value>,
    /// Index of the step currently (or next) executing.
    pub current_step: usize,
    /// Results of completed steps; index i holds the result of step i, so
    /// the recorded results always form a contiguous prefix of the steps.
    pub step_results: Vec<Value>,
    /// Gate requests awaiting a decision, keyed by gate id.
    pub pending_gates: HashMap<String, GateRequest>,
    /// Recorded gate decisions, keyed by gate id.
    pub gate_results: HashMap<String, GateResult>,
    /// Set while paused on a gate.
    pub paused_for_gate: Option<PausedGate>,
    /// When execution started.
    pub started_at: DateTime<Utc>,
    /// When a terminal state was reached.
    pub ended_at: Option<DateTime<Utc>>,
    /// Failure reason for `Failed` workflows.
    pub error: Option<String>,
}

impl Workflow {
    /// Create a new pending workflow from a definition.
    pub fn new(definition: WorkflowDefinition, context: HashMap<String, Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            definition,
            status: WorkflowStatus::Pending,
            context,
            current_step: 0,
            step_results: Vec::new(),
            pending_gates: HashMap::new(),
            gate_results: HashMap::new(),
            paused_for_gate: None,
            started_at: Utc::now(),
            ended_at: None,
            error: None,
        }
    }

    /// Mark the workflow terminal with the given status.
    pub fn finish(&mut self, status: WorkflowStatus, error: Option<String>) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.error = error;
        self.ended_at = Some(Utc::now());
    }

    /// Pause the workflow on the given gate.
    pub fn pause_for_gate(&mut self, request: GateRequest) {
        self.paused_for_gate = Some(PausedGate {
            step_index: request.step_index,
            gate_id: request.gate_id.clone(),
            paused_at: Utc::now(),
        });
        self.pending_gates.insert(request.gate_id.clone(), request);
        self.status = WorkflowStatus::Paused;
    }

    /// Record a gate decision and clear the pending entry.
    pub fn record_gate_result(&mut self, result: GateResult) {
        self.pending_gates.remove(&result.gate_id);
        self.gate_results.insert(result.gate_id.clone(), result);
    }

    /// Fraction of steps completed, in [0, 1].
    pub fn progress(&self) -> f64 {
        if self.definition.steps.is_empty() {
            return 1.0;
        }
        self.step_results.len() as f64 / self.definition.steps.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn two_step_definition() -> WorkflowDefinition {
        WorkflowDefinition::new("test")
            .with_step(StepDefinition::new("log").with_params(json!({"message": "hi"})))
            .with_step(StepDefinition::new("delay").with_params(json!({"duration_ms": 10})))
    }

    #[test]
    fn test_definition_validation() {
        assert!(WorkflowDefinition::new("empty").validate().is_err());
        assert!(two_step_definition().validate().is_ok());
        assert!(WorkflowDefinition::new(" ")
            .with_step(StepDefinition::new("log"))
            .validate()
            .is_err());
    }

    #[test]
    fn test_workflow_starts_pending() {
        let wf = Workflow::new(two_step_definition(), HashMap::new());
        assert_eq!(wf.status, WorkflowStatus::Pending);
        assert_eq!(wf.current_step, 0);
        assert!(wf.step_results.is_empty());
        assert!(wf.paused_for_gate.is_none());
    }

    #[test]
    fn test_pause_and_resume_bookkeeping() {
        let mut wf = Workflow::new(two_step_definition(), HashMap::new());
        let request = GateRequest {
            gate_id: "g1".to_string(),
            step_index: 1,
            step_label: "delay".to_string(),
            workflow_context: HashMap::new(),
            business_impact: String::new(),
            stakeholders: Vec::new(),
            timeout_ms: None,
            requested_at: Utc::now(),
        };
        wf.pause_for_gate(request);
        assert_eq!(wf.status, WorkflowStatus::Paused);
        assert!(wf.pending_gates.contains_key("g1"));
        assert_eq!(wf.paused_for_gate.as_ref().unwrap().step_index, 1);

        wf.record_gate_result(GateResult {
            gate_id: "g1".to_string(),
            approved: true,
            auto: false,
            decided_at: Utc::now(),
        });
        assert!(wf.pending_gates.is_empty());
        assert!(wf.gate_results["g1"].approved);
    }

    #[test]
    fn test_finish_records_end_time() {
        let mut wf = Workflow::new(two_step_definition(), HashMap::new());
        wf.finish(WorkflowStatus::Failed, Some("boom".to_string()));
        assert_eq!(wf.status, WorkflowStatus::Failed);
        assert!(wf.ended_at.is_some());
        assert_eq!(wf.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_progress() {
        let mut wf = Workflow::new(two_step_definition(), HashMap::new());
        assert!(wf.progress().abs() < f64::EPSILON);
        wf.step_results.push(json!({"logged": "hi"}));
        assert!((wf.progress() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(WorkflowStatus::Completed.is_terminal());
        assert!(WorkflowStatus::Failed.is_terminal());
        assert!(WorkflowStatus::Cancelled.is_terminal());
        assert!(!WorkflowStatus::Paused.is_terminal());
        assert!(!WorkflowStatus::Running.is_terminal());
    }
}

//! MCP-style tool surface.
//!
//! Every tool takes and returns JSON and is wrapped in a
//! `{success, …, error?}` envelope. Errors never cross this boundary as
//! panics; domain errors become structured envelope fields.

pub mod handlers;

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::services::sparc::SparcEngine;
use crate::services::swarm_coordinator::SwarmCoordinator;
use crate::services::workflow_engine::WorkflowEngine;

/// The tool names this surface serves.
pub const TOOL_NAMES: [&str; 17] = [
    "create_project",
    "execute_phase",
    "get_project_status",
    "generate_artifacts",
    "validate_completion",
    "list_projects",
    "refine_implementation",
    "apply_template",
    "execute_full_workflow",
    "start_workflow",
    "cancel_workflow",
    "resume_after_gate",
    "get_workflow_status",
    "register_agent",
    "remove_agent",
    "list_agents",
    "swarm_metrics",
];

/// The composed tool surface over the kernel services.
pub struct ToolSet {
    sparc: Arc<SparcEngine>,
    workflows: Arc<WorkflowEngine>,
    swarm: Arc<SwarmCoordinator>,
}

impl ToolSet {
    pub fn new(
        sparc: Arc<SparcEngine>,
        workflows: Arc<WorkflowEngine>,
        swarm: Arc<SwarmCoordinator>,
    ) -> Self {
        Self {
            sparc,
            workflows,
            swarm,
        }
    }

    /// Handle one tool call, always returning an envelope.
    pub async fn handle(&self, tool: &str, params: Value) -> Value {
        debug!(tool, "Tool call");
        let result = self.dispatch(tool, params).await;
        match result {
            Ok(payload) => envelope_ok(payload),
            Err(e) => {
                warn!(tool, error = %e, "Tool call failed");
                envelope_err(&e)
            }
        }
    }

    async fn dispatch(&self, tool: &str, params: Value) -> DomainResult<Value> {
        match tool {
            "create_project" => handlers::projects::create_project(&self.sparc, params).await,
            "execute_phase" => handlers::projects::execute_phase(&self.sparc, params).await,
            "get_project_status" => {
                handlers::projects::get_project_status(&self.sparc, params).await
            }
            "generate_artifacts" => {
                handlers::projects::generate_artifacts(&self.sparc, params).await
            }
            "validate_completion" => {
                handlers::projects::validate_completion(&self.sparc, params).await
            }
            "list_projects" => handlers::projects::list_projects(&self.sparc, params).await,
            "refine_implementation" => {
                handlers::projects::refine_implementation(&self.sparc, params).await
            }
            "apply_template" => handlers::projects::apply_template(&self.sparc, params).await,
            "execute_full_workflow" => {
                handlers::projects::execute_full_workflow(&self.sparc, params).await
            }
            "start_workflow" => handlers::workflows::start_workflow(&self.workflows, params).await,
            "cancel_workflow" => {
                handlers::workflows::cancel_workflow(&self.workflows, params).await
            }
            "resume_after_gate" => {
                handlers::workflows::resume_after_gate(&self.workflows, params).await
            }
            "get_workflow_status" => {
                handlers::workflows::get_workflow_status(&self.workflows, params).await
            }
            "register_agent" => handlers::agents::register_agent(&self.swarm, params).await,
            "remove_agent" => handlers::agents::remove_agent(&self.swarm, params).await,
            "list_agents" => handlers::agents::list_agents(&self.swarm, params).await,
            "swarm_metrics" => handlers::agents::swarm_metrics(&self.swarm, params).await,
            other => Err(DomainError::ValidationFailed(format!(
                "Unknown tool: {other}"
            ))),
        }
    }
}

fn envelope_ok(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) => {
            map.insert("success".to_string(), json!(true));
            Value::Object(map)
        }
        other => json!({ "success": true, "result": other }),
    }
}

fn envelope_err(error: &DomainError) -> Value {
    json!({
        "success": false,
        "error": error.to_string(),
        "error_kind": error.kind(),
    })
}

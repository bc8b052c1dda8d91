//! Workflow control tool handlers.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::WorkflowDefinition;
use crate::services::workflow_engine::{WorkflowEngine, WorkflowSource};

fn parse_workflow_id(params: &Value) -> DomainResult<Uuid> {
    params
        .get("workflow_id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| DomainError::ValidationFailed("workflow_id must be a UUID".to_string()))
}

pub async fn start_workflow(engine: &Arc<WorkflowEngine>, params: Value) -> DomainResult<Value> {
    let context: HashMap<String, Value> = params
        .get("context")
        .map(|v| serde_json::from_value(v.clone()))
        .transpose()?
        .unwrap_or_default();

    let source = if let Some(definition) = params.get("definition") {
        let definition: WorkflowDefinition = serde_json::from_value(definition.clone())?;
        WorkflowSource::Definition(definition)
    } else if let Some(name) = params.get("name").and_then(Value::as_str) {
        WorkflowSource::Name(name.to_string())
    } else {
        return Err(DomainError::ValidationFailed(
            "start_workflow requires a definition or a name".to_string(),
        ));
    };

    let workflow_id = engine.start_workflow(source, context).await?;
    Ok(json!({ "workflow_id": workflow_id }))
}

pub async fn cancel_workflow(engine: &Arc<WorkflowEngine>, params: Value) -> DomainResult<Value> {
    let workflow_id = parse_workflow_id(&params)?;
    let cancelled = engine.cancel_workflow(workflow_id).await;
    Ok(json!({ "cancelled": cancelled }))
}

pub async fn resume_after_gate(
    engine: &Arc<WorkflowEngine>,
    params: Value,
) -> DomainResult<Value> {
    let workflow_id = parse_workflow_id(&params)?;
    let gate_id = params
        .get("gate_id")
        .and_then(Value::as_str)
        .ok_or_else(|| DomainError::ValidationFailed("gate_id is required".to_string()))?;
    let approved = params
        .get("approved")
        .and_then(Value::as_bool)
        .ok_or_else(|| DomainError::ValidationFailed("approved must be a boolean".to_string()))?;

    engine
        .resume_after_gate(workflow_id, gate_id, approved)
        .await?;
    Ok(json!({ "workflow_id": workflow_id, "approved": approved }))
}

pub async fn get_workflow_status(
    engine: &Arc<WorkflowEngine>,
    params: Value,
) -> DomainResult<Value> {
    let workflow_id = parse_workflow_id(&params)?;
    let workflow = engine
        .get_workflow(workflow_id)
        .await
        .ok_or(DomainError::WorkflowNotFound(workflow_id))?;
    Ok(json!({
        "workflow_id": workflow.id,
        "name": workflow.definition.name,
        "status": workflow.status.to_string(),
        "current_step": workflow.current_step,
        "step_results": workflow.step_results,
        "progress": workflow.progress(),
        "paused_for_gate": workflow.paused_for_gate,
        "pending_gates": workflow.pending_gates.keys().collect::<Vec<_>>(),
        "error": workflow.error,
    }))
}

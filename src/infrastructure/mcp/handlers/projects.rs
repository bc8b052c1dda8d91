//! Project tool handlers.

use serde_json::{json, Value};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ProjectDomain, RefinementFeedback, SparcPhase, SparcProject};
use crate::services::sparc::{CreateProject, SparcEngine};

fn parse_project_id(params: &Value) -> DomainResult<Uuid> {
    params
        .get("project_id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| DomainError::ValidationFailed("project_id must be a UUID".to_string()))
}

fn parse_phase(params: &Value) -> DomainResult<SparcPhase> {
    params
        .get("phase")
        .and_then(Value::as_str)
        .and_then(SparcPhase::parse_str)
        .ok_or_else(|| {
            DomainError::ValidationFailed(
                "phase must be one of: specification, pseudocode, architecture, refinement, completion"
                    .to_string(),
            )
        })
}

fn project_summary(project: &SparcProject, include_details: bool) -> Value {
    let mut summary = json!({
        "project_id": project.id,
        "name": &project.name,
        "domain": project.domain.as_str(),
        "complexity": project.complexity.as_str(),
        "current_phase": project.current_phase.as_str(),
        "overall_progress": project.progress.overall_progress,
        "completed_phases": project
            .progress
            .completed_phases
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>(),
    });
    if include_details {
        summary["phase_status"] = serde_json::to_value(&project.progress.phase_status)
            .unwrap_or(Value::Null);
        summary["refinement_iterations"] = json!(project.refinements.len());
        summary["has_specification"] = json!(project.specification.is_some());
        summary["has_architecture"] = json!(project.architecture.is_some());
        summary["has_implementation"] = json!(project.implementation.is_some());
    }
    summary
}

pub async fn create_project(sparc: &SparcEngine, params: Value) -> DomainResult<Value> {
    let request: CreateProject = serde_json::from_value(params)?;
    let project = sparc.create_project(request).await?;
    Ok(json!({ "project_id": project.id }))
}

pub async fn execute_phase(sparc: &SparcEngine, params: Value) -> DomainResult<Value> {
    let project_id = parse_project_id(&params)?;
    let phase = parse_phase(&params)?;
    let result = sparc.execute_phase(project_id, phase).await?;
    Ok(json!({
        "phase": result.phase.as_str(),
        "deliverables": result.deliverables.iter().map(|d| &d.name).collect::<Vec<_>>(),
        "metrics": result.metrics,
        "next_phase": result.next_phase.map(|p| p.as_str()),
        "recommendations": result.recommendations,
    }))
}

pub async fn get_project_status(sparc: &SparcEngine, params: Value) -> DomainResult<Value> {
    let project_id = parse_project_id(&params)?;
    let include_details = params
        .get("include_details")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let project = sparc
        .get_project(project_id)
        .await
        .ok_or(DomainError::ProjectNotFound(project_id))?;
    Ok(project_summary(&project, include_details))
}

pub async fn generate_artifacts(sparc: &SparcEngine, params: Value) -> DomainResult<Value> {
    let project_id = parse_project_id(&params)?;
    let kinds: Option<Vec<String>> = params
        .get("artifact_types")
        .and_then(|v| serde_json::from_value(v.clone()).ok());
    let artifacts = sparc
        .generate_artifacts(project_id, kinds.as_deref())
        .await?;
    let count = artifacts.len();
    Ok(json!({
        "artifacts": artifacts,
        "count": count,
    }))
}

pub async fn validate_completion(sparc: &SparcEngine, params: Value) -> DomainResult<Value> {
    let project_id = parse_project_id(&params)?;
    let report = sparc.validate_completion(project_id).await?;
    Ok(json!({
        "readyForProduction": report.ready_for_production,
        "completed_phases": report
            .completed_phases
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>(),
        "checks": report.checks,
    }))
}

pub async fn list_projects(sparc: &SparcEngine, params: Value) -> DomainResult<Value> {
    let domain = params
        .get("domain")
        .and_then(Value::as_str)
        .and_then(ProjectDomain::parse_str);
    let status = params.get("status").and_then(Value::as_str);
    let projects = sparc.list_projects(domain, status).await;
    Ok(json!({
        "projects": projects
            .iter()
            .map(|p| project_summary(p, false))
            .collect::<Vec<_>>(),
        "count": projects.len(),
    }))
}

pub async fn refine_implementation(sparc: &SparcEngine, params: Value) -> DomainResult<Value> {
    let project_id = parse_project_id(&params)?;
    let feedback: RefinementFeedback = params
        .get("feedback")
        .map(|v| serde_json::from_value(v.clone()))
        .transpose()?
        .unwrap_or_default();
    let result = sparc.refine_implementation(project_id, feedback).await?;
    Ok(json!({
        "phase": result.phase.as_str(),
        "deliverables": result.deliverables.iter().map(|d| &d.name).collect::<Vec<_>>(),
        "recommendations": result.recommendations,
    }))
}

pub async fn apply_template(sparc: &SparcEngine, params: Value) -> DomainResult<Value> {
    let project_id = parse_project_id(&params)?;
    let template_id = params
        .get("template_type")
        .or_else(|| params.get("template_id"))
        .and_then(Value::as_str)
        .ok_or_else(|| DomainError::ValidationFailed("template_type is required".to_string()))?;
    let report = sparc.apply_template(project_id, template_id).await?;
    Ok(json!({
        "template_id": report.template_id,
        "customizations": report.customizations,
    }))
}

pub async fn execute_full_workflow(sparc: &SparcEngine, params: Value) -> DomainResult<Value> {
    let project_id = parse_project_id(&params)?;
    let results = sparc.execute_full(project_id).await?;
    Ok(json!({
        "phases_executed": results.iter().map(|r| r.phase.as_str()).collect::<Vec<_>>(),
        "deliverable_count": results.iter().map(|r| r.deliverables.len()).sum::<usize>(),
    }))
}

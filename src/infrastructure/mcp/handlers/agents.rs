//! Agent control tool handlers.

use serde_json::{json, Value};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Agent, AgentStatus, AgentType};
use crate::services::agent_registry::AgentFilter;
use crate::services::swarm_coordinator::SwarmCoordinator;

pub async fn register_agent(swarm: &SwarmCoordinator, params: Value) -> DomainResult<Value> {
    let id = params
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| DomainError::ValidationFailed("agent id is required".to_string()))?;
    let agent_type = params
        .get("type")
        .and_then(Value::as_str)
        .and_then(AgentType::parse_str)
        .ok_or_else(|| DomainError::ValidationFailed("unknown agent type".to_string()))?;
    let capabilities: Vec<String> = params
        .get("capabilities")
        .map(|v| serde_json::from_value(v.clone()))
        .transpose()?
        .unwrap_or_default();

    let agent = Agent::new(id, agent_type).with_capabilities(capabilities);
    swarm.register_agent(agent).await?;
    Ok(json!({ "agent_id": id }))
}

pub async fn remove_agent(swarm: &SwarmCoordinator, params: Value) -> DomainResult<Value> {
    let id = params
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| DomainError::ValidationFailed("agent id is required".to_string()))?;
    let removed = swarm.remove_agent(id).await?;
    Ok(json!({ "removed": removed }))
}

pub async fn list_agents(swarm: &SwarmCoordinator, params: Value) -> DomainResult<Value> {
    let filter = AgentFilter {
        status: params
            .get("status")
            .and_then(Value::as_str)
            .and_then(AgentStatus::parse_str),
        agent_type: params
            .get("type")
            .and_then(Value::as_str)
            .and_then(AgentType::parse_str),
        capability: params
            .get("capability")
            .and_then(Value::as_str)
            .map(str::to_string),
    };
    let agents = swarm.list_agents(&filter).await;
    Ok(json!({
        "agents": agents
            .iter()
            .map(|a| json!({
                "id": &a.id,
                "type": a.agent_type.as_str(),
                "status": a.status.as_str(),
                "capabilities": &a.capabilities,
                "performance": &a.performance,
            }))
            .collect::<Vec<_>>(),
        "count": agents.len(),
    }))
}

pub async fn swarm_metrics(swarm: &SwarmCoordinator, _params: Value) -> DomainResult<Value> {
    let metrics = swarm.metrics().await;
    serde_json::to_value(metrics).map_err(Into::into)
}

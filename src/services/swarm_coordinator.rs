//! Swarm coordinator.
//!
//! Owns agent lifecycle and topology-wide coordination fan-out, and exposes
//! the continuously maintained swarm metrics. Dispatch itself lives in
//! [`TaskDispatcher`](crate::services::dispatcher::TaskDispatcher); this
//! service wires the registry and dispatcher together behind one surface.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::{timeout, Duration};
use tracing::{info, instrument, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{Agent, AgentStatus, SwarmConfig, TaskSpec};
use crate::services::agent_registry::{AgentFilter, AgentRegistry};
use crate::services::dispatcher::TaskDispatcher;
use crate::services::event_bus::{EventBus, EventCategory, EventPayload, EventSeverity};

/// Coordination pattern across agents. Informational in the core; reserved
/// for future strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    Mesh,
    Hierarchical,
    Ring,
    Star,
}

impl Default for Topology {
    fn default() -> Self {
        Self::Mesh
    }
}

impl Topology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mesh => "mesh",
            Self::Hierarchical => "hierarchical",
            Self::Ring => "ring",
            Self::Star => "star",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mesh" => Some(Self::Mesh),
            "hierarchical" => Some(Self::Hierarchical),
            "ring" => Some(Self::Ring),
            "star" => Some(Self::Star),
            _ => None,
        }
    }
}

/// Outcome of one coordination round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinationReport {
    pub topology: Topology,
    pub success_count: usize,
    pub latencies_ms: Vec<f64>,
    pub success_rate: f64,
    pub avg_latency_ms: f64,
    /// True when the success rate clears the configured threshold.
    pub success: bool,
}

/// Continuously maintained swarm aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmMetrics {
    pub agent_count: usize,
    /// Agents whose status is not offline.
    pub active_agents: usize,
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub avg_response_ms: f64,
    /// Completed tasks per minute of uptime.
    pub throughput_per_min: f64,
    pub error_rate: f64,
    pub uptime_ms: u64,
}

/// Swarm coordinator over registry and dispatcher.
pub struct SwarmCoordinator {
    registry: Arc<AgentRegistry>,
    dispatcher: Arc<TaskDispatcher>,
    event_bus: Arc<EventBus>,
    config: SwarmConfig,
    started_at: DateTime<Utc>,
}

impl SwarmCoordinator {
    pub fn new(config: SwarmConfig, event_bus: Arc<EventBus>) -> Self {
        let registry = Arc::new(AgentRegistry::new(config.max_agents));
        let dispatcher = Arc::new(TaskDispatcher::new(registry.clone(), event_bus.clone()));
        Self {
            registry,
            dispatcher,
            event_bus,
            config,
            started_at: Utc::now(),
        }
    }

    pub fn registry(&self) -> Arc<AgentRegistry> {
        self.registry.clone()
    }

    pub fn dispatcher(&self) -> Arc<TaskDispatcher> {
        self.dispatcher.clone()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Register a new agent.
    pub async fn register_agent(&self, agent: Agent) -> DomainResult<()> {
        let agent_id = agent.id.clone();
        self.registry.register(agent).await?;
        self.event_bus.publish(
            EventSeverity::Info,
            EventCategory::Agent,
            EventPayload::AgentRegistered { agent_id },
        );
        Ok(())
    }

    /// Remove an agent; rejected while it holds an assignment.
    pub async fn remove_agent(&self, id: &str) -> DomainResult<bool> {
        let removed = self.registry.remove(id).await?;
        if removed {
            self.event_bus.publish(
                EventSeverity::Info,
                EventCategory::Agent,
                EventPayload::AgentRemoved {
                    agent_id: id.to_string(),
                },
            );
        }
        Ok(removed)
    }

    /// List agents matching the filter.
    pub async fn list_agents(&self, filter: &AgentFilter) -> Vec<Agent> {
        self.registry.list(filter).await
    }

    /// Explicitly return an errored agent to the idle pool.
    pub async fn reset_agent(&self, id: &str) -> DomainResult<Agent> {
        self.registry
            .update(id, |a| {
                if a.status == AgentStatus::Error {
                    a.status = AgentStatus::Idle;
                }
            })
            .await
    }

    // ========================================================================
    // Dispatch passthrough
    // ========================================================================

    /// Assign the best-fitting agent; `None` means no fit.
    pub async fn assign(&self, task: &TaskSpec) -> DomainResult<Option<String>> {
        self.dispatcher.assign(task).await
    }

    /// Complete an assigned task (idempotent).
    pub async fn complete(&self, task_id: &str, result: Value) -> DomainResult<()> {
        self.dispatcher.complete(task_id, result).await
    }

    // ========================================================================
    // Topology coordination
    // ========================================================================

    /// Synchronize each agent's status and capabilities into the registry
    /// within a bounded per-agent budget.
    ///
    /// Agents are coordinated independently with no ordering between them;
    /// failures surface as coordination-error events rather than aborting
    /// the round.
    #[instrument(skip(self, agents), fields(topology = topology.as_str(), count = agents.len()))]
    pub async fn coordinate_swarm(
        &self,
        agents: Vec<Agent>,
        topology: Topology,
    ) -> CoordinationReport {
        let total = agents.len();
        let budget = Duration::from_millis(self.config.coordination_budget_ms);

        let steps = agents.into_iter().map(|agent| {
            let registry = self.registry.clone();
            async move {
                let agent_id = agent.id.clone();
                let start = Instant::now();
                let outcome = timeout(budget, registry.upsert(agent)).await;
                let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
                match outcome {
                    Ok(Ok(())) => (agent_id, latency_ms, None),
                    Ok(Err(e)) => (agent_id, latency_ms, Some(e.to_string())),
                    Err(_) => (agent_id, latency_ms, Some("coordination budget exceeded".to_string())),
                }
            }
        });

        let outcomes = futures::future::join_all(steps).await;

        let mut latencies_ms = Vec::with_capacity(total);
        let mut success_count = 0usize;
        for (agent_id, latency_ms, error) in outcomes {
            latencies_ms.push(latency_ms);
            match error {
                None => success_count += 1,
                Some(error) => {
                    warn!(agent_id, error, "Coordination step failed");
                    self.event_bus.publish(
                        EventSeverity::Error,
                        EventCategory::Coordination,
                        EventPayload::CoordinationError { agent_id, error },
                    );
                }
            }
        }

        let success_rate = if total == 0 {
            1.0
        } else {
            success_count as f64 / total as f64
        };
        let avg_latency_ms = if latencies_ms.is_empty() {
            0.0
        } else {
            latencies_ms.iter().sum::<f64>() / latencies_ms.len() as f64
        };
        let success = success_rate > self.config.success_threshold;

        info!(success_count, total, success_rate, "Coordination round finished");
        CoordinationReport {
            topology,
            success_count,
            latencies_ms,
            success_rate,
            avg_latency_ms,
            success,
        }
    }

    // ========================================================================
    // Metrics
    // ========================================================================

    /// Aggregate swarm metrics.
    pub async fn metrics(&self) -> SwarmMetrics {
        let agents = self.registry.snapshot().await;
        let agent_count = agents.len();
        let active_agents = agents
            .iter()
            .filter(|a| a.status != AgentStatus::Offline)
            .count();

        // Weighted averages over per-agent completion counts.
        let mut weighted_ms = 0.0;
        let mut weighted_err = 0.0;
        let mut weight = 0.0;
        for agent in &agents {
            let n = agent.performance.tasks_completed as f64;
            weighted_ms += agent.performance.avg_response_ms * n;
            weighted_err += agent.performance.error_rate * n;
            weight += n;
        }
        let avg_response_ms = if weight > 0.0 { weighted_ms / weight } else { 0.0 };
        let error_rate = if weight > 0.0 { weighted_err / weight } else { 0.0 };

        let uptime_ms = (Utc::now() - self.started_at).num_milliseconds().max(0) as u64;
        let uptime_min = uptime_ms as f64 / 60_000.0;
        let completed_tasks = self.dispatcher.total_completed();
        let throughput_per_min = if uptime_min > 0.0 {
            completed_tasks as f64 / uptime_min
        } else {
            0.0
        };

        SwarmMetrics {
            agent_count,
            active_agents,
            total_tasks: self.dispatcher.total_assigned(),
            completed_tasks,
            avg_response_ms,
            throughput_per_min,
            error_rate,
            uptime_ms,
        }
    }
}

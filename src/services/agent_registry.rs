//! Agent registry.
//!
//! The authoritative mutable store for agent lifecycle. Only the dispatcher
//! mutates status and only task completion updates performance counters.
//! The registry lock is held for O(1) work only.

use std::collections::BTreeMap;

use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Agent, AgentStatus, AgentType};

/// Filter for listing agents.
#[derive(Debug, Clone, Default)]
pub struct AgentFilter {
    pub status: Option<AgentStatus>,
    pub agent_type: Option<AgentType>,
    /// Only agents offering this capability.
    pub capability: Option<String>,
}

/// Registry of worker agents keyed by id.
///
/// A `BTreeMap` keeps iteration ordered by id, which is what makes
/// dispatch tie-breaking deterministic.
pub struct AgentRegistry {
    agents: RwLock<BTreeMap<String, Agent>>,
    max_agents: usize,
}

impl AgentRegistry {
    pub fn new(max_agents: usize) -> Self {
        Self {
            agents: RwLock::new(BTreeMap::new()),
            max_agents,
        }
    }

    /// Register a new agent. Fails when the id is already present.
    #[instrument(skip(self, agent), fields(agent_id = %agent.id))]
    pub async fn register(&self, agent: Agent) -> DomainResult<()> {
        agent.validate().map_err(DomainError::ValidationFailed)?;

        let mut agents = self.agents.write().await;
        if agents.contains_key(&agent.id) {
            return Err(DomainError::AgentAlreadyExists(agent.id));
        }
        if agents.len() >= self.max_agents {
            return Err(DomainError::ValidationFailed(format!(
                "Registry is full ({} agents)",
                self.max_agents
            )));
        }
        info!(agent_type = agent.agent_type.as_str(), "Registered agent");
        agents.insert(agent.id.clone(), agent);
        Ok(())
    }

    /// Remove an agent. No-op when absent; rejected while the agent is busy.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: &str) -> DomainResult<bool> {
        let mut agents = self.agents.write().await;
        match agents.get(id) {
            None => Ok(false),
            Some(agent) if agent.status == AgentStatus::Busy => {
                Err(DomainError::AgentBusy(id.to_string()))
            }
            Some(_) => {
                agents.remove(id);
                info!("Removed agent");
                Ok(true)
            }
        }
    }

    /// Fetch a snapshot of one agent.
    pub async fn get(&self, id: &str) -> Option<Agent> {
        self.agents.read().await.get(id).cloned()
    }

    /// List agents matching the filter, ordered by id.
    pub async fn list(&self, filter: &AgentFilter) -> Vec<Agent> {
        self.agents
            .read()
            .await
            .values()
            .filter(|a| filter.status.is_none_or(|s| a.status == s))
            .filter(|a| filter.agent_type.is_none_or(|t| a.agent_type == t))
            .filter(|a| {
                filter
                    .capability
                    .as_ref()
                    .is_none_or(|c| a.capabilities.contains(c))
            })
            .cloned()
            .collect()
    }

    /// Ids of agents whose status is idle or busy, ordered.
    pub async fn active_ids(&self) -> Vec<String> {
        self.agents
            .read()
            .await
            .values()
            .filter(|a| a.status.is_active())
            .map(|a| a.id.clone())
            .collect()
    }

    /// Insert or replace an agent record, preserving existing performance
    /// counters. Used by swarm coordination to synchronize status and
    /// capabilities.
    pub async fn upsert(&self, mut agent: Agent) -> DomainResult<()> {
        agent.validate().map_err(DomainError::ValidationFailed)?;
        let mut agents = self.agents.write().await;
        if let Some(existing) = agents.get(&agent.id) {
            agent.performance = existing.performance.clone();
            agent.registered_at = existing.registered_at;
        } else if agents.len() >= self.max_agents {
            return Err(DomainError::ValidationFailed(format!(
                "Registry is full ({} agents)",
                self.max_agents
            )));
        }
        agent.updated_at = chrono::Utc::now();
        agents.insert(agent.id.clone(), agent);
        Ok(())
    }

    /// Mutate one agent in place under the write lock.
    ///
    /// Returns `AgentNotFound` when the id is absent. The closure must do
    /// O(1) work; the registry lock is held across it.
    pub async fn update<F>(&self, id: &str, mutate: F) -> DomainResult<Agent>
    where
        F: FnOnce(&mut Agent),
    {
        let mut agents = self.agents.write().await;
        let agent = agents
            .get_mut(id)
            .ok_or_else(|| DomainError::AgentNotFound(id.to_string()))?;
        mutate(agent);
        agent.updated_at = chrono::Utc::now();
        Ok(agent.clone())
    }

    /// Number of registered agents.
    pub async fn count(&self) -> usize {
        self.agents.read().await.len()
    }

    /// Number of non-offline agents.
    pub async fn active_count(&self) -> usize {
        self.agents
            .read()
            .await
            .values()
            .filter(|a| a.status != AgentStatus::Offline)
            .count()
    }

    /// Snapshot of all agents, ordered by id.
    pub async fn snapshot(&self) -> Vec<Agent> {
        self.agents.read().await.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: &str) -> Agent {
        Agent::new(id, AgentType::Coder).with_capability("web")
    }

    #[tokio::test]
    async fn test_register_and_duplicate() {
        let registry = AgentRegistry::new(10);
        registry.register(agent("a1")).await.unwrap();

        let err = registry.register(agent("a1")).await.unwrap_err();
        assert!(matches!(err, DomainError::AgentAlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_remove_semantics() {
        let registry = AgentRegistry::new(10);
        registry.register(agent("a1")).await.unwrap();

        // Removing an absent agent is a no-op
        assert!(!registry.remove("missing").await.unwrap());

        // Removing a busy agent is rejected
        registry
            .update("a1", |a| a.status = AgentStatus::Busy)
            .await
            .unwrap();
        assert!(matches!(
            registry.remove("a1").await.unwrap_err(),
            DomainError::AgentBusy(_)
        ));

        // Back to idle, removal succeeds
        registry
            .update("a1", |a| a.status = AgentStatus::Idle)
            .await
            .unwrap();
        assert!(registry.remove("a1").await.unwrap());
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_capacity_limit() {
        let registry = AgentRegistry::new(1);
        registry.register(agent("a1")).await.unwrap();
        assert!(registry.register(agent("a2")).await.is_err());
    }

    #[tokio::test]
    async fn test_list_filters() {
        let registry = AgentRegistry::new(10);
        registry
            .register(Agent::new("a1", AgentType::Coder).with_capability("web"))
            .await
            .unwrap();
        registry
            .register(Agent::new("a2", AgentType::Tester).with_capability("test"))
            .await
            .unwrap();

        let all = registry.list(&AgentFilter::default()).await;
        assert_eq!(all.len(), 2);

        let coders = registry
            .list(&AgentFilter {
                agent_type: Some(AgentType::Coder),
                ..AgentFilter::default()
            })
            .await;
        assert_eq!(coders.len(), 1);
        assert_eq!(coders[0].id, "a1");

        let testers = registry
            .list(&AgentFilter {
                capability: Some("test".to_string()),
                ..AgentFilter::default()
            })
            .await;
        assert_eq!(testers.len(), 1);
        assert_eq!(testers[0].id, "a2");
    }

    #[tokio::test]
    async fn test_active_ids_excludes_offline_and_error() {
        let registry = AgentRegistry::new(10);
        registry.register(agent("a1")).await.unwrap();
        registry.register(agent("a2")).await.unwrap();
        registry.register(agent("a3")).await.unwrap();
        registry
            .update("a2", |a| a.status = AgentStatus::Offline)
            .await
            .unwrap();
        registry
            .update("a3", |a| a.status = AgentStatus::Error)
            .await
            .unwrap();

        assert_eq!(registry.active_ids().await, vec!["a1".to_string()]);
    }

    #[tokio::test]
    async fn test_upsert_preserves_performance() {
        let registry = AgentRegistry::new(10);
        registry.register(agent("a1")).await.unwrap();
        registry
            .update("a1", |a| a.performance.record_completion(100.0))
            .await
            .unwrap();

        let replacement = Agent::new("a1", AgentType::Coder).with_capability("parse");
        registry.upsert(replacement).await.unwrap();

        let agent = registry.get("a1").await.unwrap();
        assert_eq!(agent.performance.tasks_completed, 1);
        assert!(agent.capabilities.contains("parse"));
    }
}

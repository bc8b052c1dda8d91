//! Integration tests for capability-scored dispatch.
//!
//! Covers dispatch by capability, deterministic tie-breaking, completion
//! accounting, and the busy-agent removal guard.

use std::sync::Arc;

use chorus::domain::errors::DomainError;
use chorus::domain::models::{Agent, AgentStatus, AgentType, Priority, SwarmConfig, TaskSpec};
use chorus::services::event_bus::EventBus;
use chorus::services::swarm_coordinator::{SwarmCoordinator, Topology};

fn swarm() -> SwarmCoordinator {
    SwarmCoordinator::new(SwarmConfig::default(), Arc::new(EventBus::default()))
}

#[tokio::test]
async fn dispatch_by_capability() {
    let swarm = swarm();
    swarm
        .register_agent(Agent::new("a1", AgentType::Coder).with_capabilities(["web", "parse"]))
        .await
        .unwrap();
    swarm
        .register_agent(Agent::new("a2", AgentType::Coder).with_capability("web"))
        .await
        .unwrap();

    let task = TaskSpec::new("t1", "scrape and parse")
        .with_priority(Priority::new(5))
        .with_requirements(["web", "parse"]);
    let assigned = swarm.assign(&task).await.unwrap();
    assert_eq!(assigned.as_deref(), Some("a1"));

    let agent = swarm.registry().get("a1").await.unwrap();
    assert_eq!(agent.status, AgentStatus::Busy);

    // Complete after ~200 ms; the rolling average reflects the duration.
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
    swarm.complete("t1", serde_json::json!({"ok": true})).await.unwrap();

    let agent = swarm.registry().get("a1").await.unwrap();
    assert_eq!(agent.status, AgentStatus::Idle);
    assert_eq!(agent.performance.tasks_completed, 1);
    assert!(agent.performance.avg_response_ms >= 200.0);
    assert!(agent.performance.avg_response_ms < 2_000.0);
}

#[tokio::test]
async fn dispatch_tie_break_is_lowest_id() {
    let swarm = swarm();
    for id in ["z", "a"] {
        let mut agent = Agent::new(id, AgentType::Coder).with_capability("x");
        agent.performance.tasks_completed = 5;
        agent.performance.avg_response_ms = 100.0;
        swarm.register_agent(agent).await.unwrap();
    }

    let task = TaskSpec::new("t1", "tied").with_requirement("x");
    assert_eq!(swarm.assign(&task).await.unwrap().as_deref(), Some("a"));
}

#[tokio::test]
async fn busy_agent_implies_exactly_one_assignment() {
    let swarm = swarm();
    swarm
        .register_agent(Agent::new("a1", AgentType::Coder).with_capability("x"))
        .await
        .unwrap();

    let t1 = TaskSpec::new("t1", "first").with_requirement("x");
    let t2 = TaskSpec::new("t2", "second").with_requirement("x");
    assert!(swarm.assign(&t1).await.unwrap().is_some());
    // The only capable agent is busy: no assignment, no error.
    assert_eq!(swarm.assign(&t2).await.unwrap(), None);

    // Exactly one in-flight assignment references the busy agent.
    assert_eq!(swarm.dispatcher().in_flight().await, 1);
    assert!(swarm.dispatcher().assignment("t1").await.is_some());
    assert!(swarm.dispatcher().assignment("t2").await.is_none());
}

#[tokio::test]
async fn completion_is_idempotent() {
    let swarm = swarm();
    swarm
        .register_agent(Agent::new("a1", AgentType::Coder).with_capability("x"))
        .await
        .unwrap();

    let task = TaskSpec::new("t1", "work").with_requirement("x");
    swarm.assign(&task).await.unwrap();
    swarm.complete("t1", serde_json::json!({})).await.unwrap();
    swarm.complete("t1", serde_json::json!({})).await.unwrap();

    let agent = swarm.registry().get("a1").await.unwrap();
    assert_eq!(agent.performance.tasks_completed, 1);

    // Completing a never-assigned task is also a no-op.
    swarm.complete("ghost", serde_json::json!({})).await.unwrap();
}

#[tokio::test]
async fn removing_a_busy_agent_is_rejected() {
    let swarm = swarm();
    swarm
        .register_agent(Agent::new("a1", AgentType::Coder).with_capability("x"))
        .await
        .unwrap();
    let task = TaskSpec::new("t1", "work").with_requirement("x");
    swarm.assign(&task).await.unwrap();

    assert!(matches!(
        swarm.remove_agent("a1").await.unwrap_err(),
        DomainError::AgentBusy(_)
    ));

    swarm.complete("t1", serde_json::json!({})).await.unwrap();
    assert!(swarm.remove_agent("a1").await.unwrap());
}

#[tokio::test]
async fn coordination_round_updates_registry() {
    let swarm = swarm();
    let agents: Vec<Agent> = (0..8)
        .map(|i| Agent::new(format!("agent-{i}"), AgentType::Coder).with_capability("sync"))
        .collect();

    let report = swarm.coordinate_swarm(agents, Topology::Hierarchical).await;
    assert_eq!(report.success_count, 8);
    assert!(report.success);
    assert_eq!(report.latencies_ms.len(), 8);

    let metrics = swarm.metrics().await;
    assert_eq!(metrics.agent_count, 8);
    assert_eq!(metrics.active_agents, 8);
}

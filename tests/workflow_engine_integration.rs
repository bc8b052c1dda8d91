//! Integration tests for the workflow engine.
//!
//! Covers the gate hold/resume protocol, gate rejection, concurrency
//! limits, zero timeouts, and cancellation semantics.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;

use chorus::adapters::InMemoryKvStore;
use chorus::domain::errors::DomainError;
use chorus::domain::models::{
    GateConfig, StepDefinition, WorkflowDefinition, WorkflowSettings, WorkflowStatus,
};
use chorus::domain::ports::KvStore;
use chorus::services::event_bus::EventBus;
use chorus::services::workflow_engine::WorkflowEngine;

fn engine_with(settings: WorkflowSettings) -> Arc<WorkflowEngine> {
    Arc::new(WorkflowEngine::new(
        settings,
        Arc::new(InMemoryKvStore::new()),
        Arc::new(EventBus::default()),
    ))
}

fn engine() -> Arc<WorkflowEngine> {
    engine_with(WorkflowSettings::default())
}

/// A log step followed by a gated delay step.
fn gated_definition() -> WorkflowDefinition {
    WorkflowDefinition::new("gated")
        .with_step(StepDefinition::new("log").with_params(json!({"message": "hi"})))
        .with_step(
            StepDefinition::new("delay")
                .with_params(json!({"duration": 10}))
                .with_gate(GateConfig {
                    auto_approval: false,
                    ..GateConfig::default()
                }),
        )
}

#[tokio::test]
async fn workflow_pauses_on_gate_then_completes_on_approval() {
    let engine = engine();
    let id = engine
        .start_workflow(gated_definition(), HashMap::new())
        .await
        .unwrap();

    // Step 0 runs, then the workflow pauses on the step-1 gate.
    let paused = engine.wait_for_settled(id).await.unwrap();
    assert_eq!(paused.status, WorkflowStatus::Paused);
    assert_eq!(paused.step_results, vec![json!({"logged": "hi"})]);
    let gate = paused.paused_for_gate.clone().unwrap();
    assert_eq!(gate.step_index, 1);
    assert!(paused.pending_gates.contains_key(&gate.gate_id));

    // Approval resumes execution; the gated step's handler runs.
    engine.resume_after_gate(id, &gate.gate_id, true).await.unwrap();
    let done = engine.wait_for_settled(id).await.unwrap();
    assert_eq!(done.status, WorkflowStatus::Completed);
    assert_eq!(
        done.step_results,
        vec![json!({"logged": "hi"}), json!({"delayed": 10})]
    );
    assert!(done.paused_for_gate.is_none());
    assert!(done.gate_results[&gate.gate_id].approved);
}

#[tokio::test]
async fn gate_rejection_fails_the_workflow() {
    let engine = engine();
    let id = engine
        .start_workflow(gated_definition(), HashMap::new())
        .await
        .unwrap();
    let paused = engine.wait_for_settled(id).await.unwrap();
    let gate = paused.paused_for_gate.unwrap();

    engine.resume_after_gate(id, &gate.gate_id, false).await.unwrap();
    let failed = engine.get_workflow(id).await.unwrap();
    assert_eq!(failed.status, WorkflowStatus::Failed);
    assert!(failed.error.unwrap().contains("Gate rejected"));
    assert!(failed.ended_at.is_some());
    assert_eq!(engine.active_count().await, 0);
}

#[tokio::test]
async fn resume_requires_a_paused_workflow() {
    let engine = engine();
    let definition = WorkflowDefinition::new("plain")
        .with_step(StepDefinition::new("log").with_params(json!({"message": "x"})));
    let id = engine.start_workflow(definition, HashMap::new()).await.unwrap();
    engine.wait_for_settled(id).await.unwrap();

    let err = engine.resume_after_gate(id, "gate-x", true).await.unwrap_err();
    assert!(matches!(err, DomainError::PreconditionFailed(_)));
}

#[tokio::test]
async fn concurrency_limit_preserves_active_set() {
    let engine = engine_with(WorkflowSettings {
        max_concurrent: 2,
        ..WorkflowSettings::default()
    });

    let mut held = Vec::new();
    for _ in 0..2 {
        let id = engine
            .start_workflow(gated_definition(), HashMap::new())
            .await
            .unwrap();
        engine.wait_for_settled(id).await.unwrap();
        held.push(id);
    }
    assert_eq!(engine.active_count().await, 2);

    let err = engine
        .start_workflow(gated_definition(), HashMap::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::ConcurrencyLimit { active: 2, max: 2 }
    ));
    assert_eq!(engine.active_count().await, 2);

    // Releasing one slot admits new workflows again.
    assert!(engine.cancel_workflow(held[0]).await);
    assert_eq!(engine.active_count().await, 1);
    engine
        .start_workflow(gated_definition(), HashMap::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn zero_timeout_fails_immediately() {
    let engine = engine();
    let definition = WorkflowDefinition::new("zero").with_step(
        StepDefinition::new("delay")
            .with_params(json!({"duration_ms": 60_000}))
            .with_timeout_ms(0),
    );
    let id = engine.start_workflow(definition, HashMap::new()).await.unwrap();
    let failed = engine.wait_for_settled(id).await.unwrap();
    assert_eq!(failed.status, WorkflowStatus::Failed);
    assert!(failed.error.unwrap().contains("Timed out"));
}

#[tokio::test]
async fn cancel_is_not_repeatable() {
    let engine = engine();
    let id = engine
        .start_workflow(gated_definition(), HashMap::new())
        .await
        .unwrap();
    engine.wait_for_settled(id).await.unwrap();

    assert!(engine.cancel_workflow(id).await);
    // Cancelling an already-cancelled workflow returns false.
    assert!(!engine.cancel_workflow(id).await);

    let cancelled = engine.get_workflow(id).await.unwrap();
    assert_eq!(cancelled.status, WorkflowStatus::Cancelled);
    assert!(cancelled.ended_at.is_some());
}

#[tokio::test]
async fn auto_approved_gate_never_pauses() {
    let engine = engine();
    let definition = WorkflowDefinition::new("auto").with_step(
        StepDefinition::new("log")
            .with_params(json!({"message": "go"}))
            .with_gate(GateConfig {
                auto_approval: true,
                ..GateConfig::default()
            }),
    );
    let id = engine.start_workflow(definition, HashMap::new()).await.unwrap();
    let done = engine.wait_for_settled(id).await.unwrap();
    assert_eq!(done.status, WorkflowStatus::Completed);
    assert!(done.gate_results.values().all(|g| g.auto && g.approved));
}

#[tokio::test]
async fn step_results_form_a_contiguous_prefix() {
    let engine = engine();
    let definition = WorkflowDefinition::new("three")
        .with_step(StepDefinition::new("log").with_params(json!({"message": "a"})))
        .with_step(StepDefinition::new("delay").with_params(json!({"duration_ms": 1})))
        .with_step(StepDefinition::new("log").with_params(json!({"message": "b"})));
    let id = engine.start_workflow(definition, HashMap::new()).await.unwrap();
    let done = engine.wait_for_settled(id).await.unwrap();

    assert_eq!(done.status, WorkflowStatus::Completed);
    assert_eq!(done.step_results.len(), 3);
    // The vector representation keeps the prefix property by construction:
    // index i holds the result of step i.
    assert_eq!(done.step_results[0], json!({"logged": "a"}));
    assert_eq!(done.step_results[2], json!({"logged": "b"}));
}

#[tokio::test]
async fn context_flows_between_steps() {
    let engine = engine();
    let definition = WorkflowDefinition::new("ctx")
        .with_step(
            StepDefinition::new("transform")
                .with_params(json!({"path": "count", "operation": "increment"})),
        )
        .with_step(
            StepDefinition::new("transform")
                .with_params(json!({"path": "count", "operation": "increment"})),
        );
    let mut context = HashMap::new();
    context.insert("count".to_string(), json!(0));

    let id = engine.start_workflow(definition, context).await.unwrap();
    let done = engine.wait_for_settled(id).await.unwrap();
    assert_eq!(done.status, WorkflowStatus::Completed);
    assert_eq!(done.context["count"], json!(2.0));
}

#[tokio::test]
async fn terminal_workflows_are_persisted_when_enabled() {
    let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
    let engine = Arc::new(WorkflowEngine::new(
        WorkflowSettings {
            persist_workflows: true,
            ..WorkflowSettings::default()
        },
        kv.clone(),
        Arc::new(EventBus::default()),
    ));

    let definition = WorkflowDefinition::new("persisted")
        .with_step(StepDefinition::new("log").with_params(json!({"message": "x"})));
    let id = engine.start_workflow(definition, HashMap::new()).await.unwrap();
    engine.wait_for_settled(id).await.unwrap();

    let stored = kv.retrieve(&id.to_string(), "workflows").await.unwrap();
    assert!(stored.is_some());
    assert_eq!(stored.unwrap()["status"], json!("completed"));
}

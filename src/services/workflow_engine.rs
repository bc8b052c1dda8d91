//! Workflow engine.
//!
//! Executes ordered step lists with late-bound handlers, per-step deadlines,
//! gate-based pauses, and cooperative cancellation. Each workflow runs on
//! its own task; pausing yields the task and `resume_after_gate` spawns a
//! fresh one from the gated step.
//!
//! Locking: the workflow map lock is held for O(1) bookkeeping only and is
//! always released before a handler or the KV store is invoked.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    GateConfig, GateRequest, GateResult, StepDefinition, Workflow, WorkflowDefinition,
    WorkflowSettings, WorkflowStatus,
};
use crate::domain::ports::{KvStore, StepContext, StepHandler};
use crate::services::builtin_handlers::builtin_handlers;
use crate::services::event_bus::{EventBus, EventCategory, EventPayload, EventSeverity};

// ============================================================================
// Gate policy
// ============================================================================

/// Pluggable gate decision policy.
///
/// `Some(true)`/`Some(false)` decides immediately; `None` defers the gate to
/// an external `resume_after_gate` call.
#[async_trait]
pub trait GatePolicy: Send + Sync {
    async fn decide(&self, request: &GateRequest, config: &GateConfig) -> Option<bool>;
}

/// Default policy: approve immediately only under `auto_approval`, defer
/// everything else to external resolution.
#[derive(Debug, Default)]
pub struct DefaultGatePolicy;

#[async_trait]
impl GatePolicy for DefaultGatePolicy {
    async fn decide(&self, _request: &GateRequest, config: &GateConfig) -> Option<bool> {
        config.auto_approval.then_some(true)
    }
}

// ============================================================================
// Engine
// ============================================================================

/// What to start a workflow from.
pub enum WorkflowSource {
    /// A registered definition name.
    Name(String),
    /// An inline definition.
    Definition(WorkflowDefinition),
}

impl From<&str> for WorkflowSource {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<WorkflowDefinition> for WorkflowSource {
    fn from(definition: WorkflowDefinition) -> Self {
        Self::Definition(definition)
    }
}

/// The workflow engine.
pub struct WorkflowEngine {
    settings: WorkflowSettings,
    handlers: RwLock<HashMap<String, Arc<dyn StepHandler>>>,
    definitions: RwLock<HashMap<String, WorkflowDefinition>>,
    /// All workflows by id, terminal ones included.
    workflows: RwLock<HashMap<Uuid, Workflow>>,
    /// Ids of non-terminal workflows, bounded by `max_concurrent`.
    active: RwLock<HashSet<Uuid>>,
    kv: Arc<dyn KvStore>,
    event_bus: Arc<EventBus>,
    gate_policy: Arc<dyn GatePolicy>,
}

impl WorkflowEngine {
    pub fn new(settings: WorkflowSettings, kv: Arc<dyn KvStore>, event_bus: Arc<EventBus>) -> Self {
        let mut handlers: HashMap<String, Arc<dyn StepHandler>> = HashMap::new();
        for handler in builtin_handlers() {
            handlers.insert(handler.step_type().to_string(), handler);
        }
        Self {
            settings,
            handlers: RwLock::new(handlers),
            definitions: RwLock::new(HashMap::new()),
            workflows: RwLock::new(HashMap::new()),
            active: RwLock::new(HashSet::new()),
            kv,
            event_bus,
            gate_policy: Arc::new(DefaultGatePolicy),
        }
    }

    /// Replace the gate policy.
    pub fn with_gate_policy(mut self, policy: Arc<dyn GatePolicy>) -> Self {
        self.gate_policy = policy;
        self
    }

    // ========================================================================
    // Registries
    // ========================================================================

    /// Register a step handler, replacing any prior handler of the type.
    pub async fn register_handler(&self, handler: Arc<dyn StepHandler>) {
        self.handlers
            .write()
            .await
            .insert(handler.step_type().to_string(), handler);
    }

    /// Register a named workflow definition.
    pub async fn register_definition(&self, definition: WorkflowDefinition) -> DomainResult<()> {
        definition.validate().map_err(DomainError::ValidationFailed)?;
        self.definitions
            .write()
            .await
            .insert(definition.name.clone(), definition);
        Ok(())
    }

    /// Names of registered definitions, sorted.
    pub async fn definition_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.definitions.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    // ========================================================================
    // Control operations
    // ========================================================================

    /// Start a workflow and begin asynchronous execution.
    #[instrument(skip(self, source, context))]
    pub async fn start_workflow(
        self: &Arc<Self>,
        source: impl Into<WorkflowSource>,
        context: HashMap<String, Value>,
    ) -> DomainResult<Uuid> {
        let definition = match source.into() {
            WorkflowSource::Name(name) => self
                .definitions
                .read()
                .await
                .get(&name)
                .cloned()
                .ok_or(DomainError::DefinitionNotFound(name))?,
            WorkflowSource::Definition(definition) => {
                definition
                    .validate()
                    .map_err(DomainError::ValidationFailed)?;
                definition
            }
        };

        let workflow = Workflow::new(definition, context);
        let id = workflow.id;
        {
            let mut active = self.active.write().await;
            if active.len() >= self.settings.max_concurrent {
                return Err(DomainError::ConcurrencyLimit {
                    active: active.len(),
                    max: self.settings.max_concurrent,
                });
            }
            active.insert(id);
        }
        let name = workflow.definition.name.clone();
        self.workflows.write().await.insert(id, workflow);

        info!(workflow_id = %id, name, "Started workflow");
        self.event_bus.publish(
            EventSeverity::Info,
            EventCategory::Workflow,
            EventPayload::WorkflowStarted { workflow_id: id, name },
        );

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.drive(id, 0, false).await;
        });
        Ok(id)
    }

    /// Cancel a workflow. Returns false when the workflow is unknown or
    /// already terminal. Cancellation is cooperative: an in-flight handler
    /// is not aborted, its result is discarded at the next step boundary.
    #[instrument(skip(self))]
    pub async fn cancel_workflow(&self, id: Uuid) -> bool {
        let cancelled = {
            let mut workflows = self.workflows.write().await;
            match workflows.get_mut(&id) {
                Some(wf) if !wf.status.is_terminal() => {
                    wf.finish(WorkflowStatus::Cancelled, None);
                    true
                }
                _ => false,
            }
        };
        if cancelled {
            self.active.write().await.remove(&id);
            self.event_bus.publish(
                EventSeverity::Info,
                EventCategory::Workflow,
                EventPayload::WorkflowCancelled { workflow_id: id },
            );
            self.persist(id).await;
        }
        cancelled
    }

    /// Resolve a gate the workflow is paused on.
    #[instrument(skip(self))]
    pub async fn resume_after_gate(
        self: &Arc<Self>,
        id: Uuid,
        gate_id: &str,
        approved: bool,
    ) -> DomainResult<()> {
        let resume_step = {
            let mut workflows = self.workflows.write().await;
            let wf = workflows
                .get_mut(&id)
                .ok_or(DomainError::WorkflowNotFound(id))?;

            if wf.status != WorkflowStatus::Paused {
                return Err(DomainError::PreconditionFailed(format!(
                    "Workflow {id} is not paused"
                )));
            }
            let paused = wf.paused_for_gate.as_ref().ok_or_else(|| {
                DomainError::Internal(format!("Paused workflow {id} has no gate record"))
            })?;
            if paused.gate_id != gate_id {
                return Err(DomainError::PreconditionFailed(format!(
                    "Workflow {id} is paused on gate {}, not {gate_id}",
                    paused.gate_id
                )));
            }
            let step_index = paused.step_index;

            wf.record_gate_result(GateResult {
                gate_id: gate_id.to_string(),
                approved,
                auto: false,
                decided_at: Utc::now(),
            });

            if !approved {
                let rejection = DomainError::GateRejected(gate_id.to_string());
                wf.finish(WorkflowStatus::Failed, Some(rejection.to_string()));
                None
            } else {
                wf.paused_for_gate = None;
                wf.status = WorkflowStatus::Running;
                Some(step_index)
            }
        };

        match resume_step {
            None => {
                self.active.write().await.remove(&id);
                self.event_bus.publish(
                    EventSeverity::Warning,
                    EventCategory::Workflow,
                    EventPayload::WorkflowFailed {
                        workflow_id: id,
                        error: DomainError::GateRejected(gate_id.to_string()).to_string(),
                    },
                );
                self.persist(id).await;
            }
            Some(step_index) => {
                self.event_bus.publish(
                    EventSeverity::Info,
                    EventCategory::Workflow,
                    EventPayload::WorkflowResumed {
                        workflow_id: id,
                        gate_id: gate_id.to_string(),
                    },
                );
                // The gate is resolved; re-enter the loop at the gated step
                // so its handler runs.
                let engine = Arc::clone(self);
                tokio::spawn(async move {
                    engine.drive(id, step_index, true).await;
                });
            }
        }
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Snapshot of one workflow.
    pub async fn get_workflow(&self, id: Uuid) -> Option<Workflow> {
        self.workflows.read().await.get(&id).cloned()
    }

    /// Ids of non-terminal workflows.
    pub async fn active_ids(&self) -> Vec<Uuid> {
        self.active.read().await.iter().copied().collect()
    }

    /// Number of non-terminal workflows.
    pub async fn active_count(&self) -> usize {
        self.active.read().await.len()
    }

    /// Snapshot of all workflows, newest first.
    pub async fn list_workflows(&self) -> Vec<Workflow> {
        let mut all: Vec<Workflow> = self.workflows.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all
    }

    /// Block until the workflow reaches a terminal or paused state.
    ///
    /// Intended for tests and the CLI; polls the status map.
    pub async fn wait_for_settled(&self, id: Uuid) -> Option<Workflow> {
        loop {
            {
                let workflows = self.workflows.read().await;
                match workflows.get(&id) {
                    None => return None,
                    Some(wf)
                        if wf.status.is_terminal() || wf.status == WorkflowStatus::Paused =>
                    {
                        return Some(wf.clone());
                    }
                    Some(_) => {}
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Drive the workflow from `start_step`. `gate_resolved` marks the first
    /// step's gate as already decided (the resume path).
    async fn drive(self: Arc<Self>, id: Uuid, start_step: usize, mut gate_resolved: bool) {
        let step_count = {
            let mut workflows = self.workflows.write().await;
            let Some(wf) = workflows.get_mut(&id) else {
                return;
            };
            if wf.status == WorkflowStatus::Pending {
                wf.status = WorkflowStatus::Running;
            }
            if wf.status != WorkflowStatus::Running {
                return;
            }
            wf.definition.steps.len()
        };

        for index in start_step..step_count {
            // Cancellation is observed at the top of each step.
            let Some((step, context)) = self.begin_step(id, index).await else {
                return;
            };

            // Gate protocol runs before the step's handler.
            if let Some(gate) = step.gate.clone() {
                if !gate_resolved {
                    match self.run_gate(id, index, &step, &gate, &context).await {
                        GateOutcome::Approved => {}
                        GateOutcome::Paused | GateOutcome::Rejected => return,
                    }
                }
            }
            gate_resolved = false;

            if !self.run_step(id, index, &step, context).await {
                return;
            }
        }

        self.finish_workflow(id, WorkflowStatus::Completed, None).await;
    }

    /// Record `current_step` and snapshot what the step needs. Returns
    /// `None` when the workflow is no longer running.
    async fn begin_step(
        &self,
        id: Uuid,
        index: usize,
    ) -> Option<(StepDefinition, HashMap<String, Value>)> {
        let mut workflows = self.workflows.write().await;
        let wf = workflows.get_mut(&id)?;
        if wf.status != WorkflowStatus::Running {
            debug!(workflow_id = %id, status = %wf.status, "Stopping execution");
            return None;
        }
        wf.current_step = index;
        let step = wf.definition.steps.get(index)?.clone();
        Some((step, wf.context.clone()))
    }

    /// Evaluate the gate for a step. May pause or fail the workflow.
    async fn run_gate(
        &self,
        id: Uuid,
        index: usize,
        step: &StepDefinition,
        gate: &GateConfig,
        context: &HashMap<String, Value>,
    ) -> GateOutcome {
        let gate_id = format!("gate-{id}-step-{index}");
        let request = GateRequest {
            gate_id: gate_id.clone(),
            step_index: index,
            step_label: step.name.clone().unwrap_or_else(|| step.step_type.clone()),
            workflow_context: context.clone(),
            business_impact: gate.business_impact.clone(),
            stakeholders: gate.stakeholders.clone(),
            timeout_ms: gate.timeout_ms,
            requested_at: Utc::now(),
        };

        match self.gate_policy.decide(&request, gate).await {
            Some(true) => {
                let mut workflows = self.workflows.write().await;
                if let Some(wf) = workflows.get_mut(&id) {
                    wf.record_gate_result(GateResult {
                        gate_id,
                        approved: true,
                        auto: true,
                        decided_at: Utc::now(),
                    });
                }
                GateOutcome::Approved
            }
            Some(false) => {
                {
                    let mut workflows = self.workflows.write().await;
                    if let Some(wf) = workflows.get_mut(&id) {
                        wf.record_gate_result(GateResult {
                            gate_id: gate_id.clone(),
                            approved: false,
                            auto: true,
                            decided_at: Utc::now(),
                        });
                    }
                }
                let rejection = DomainError::GateRejected(gate_id);
                self.finish_workflow(id, WorkflowStatus::Failed, Some(rejection.to_string()))
                    .await;
                GateOutcome::Rejected
            }
            None => {
                {
                    let mut workflows = self.workflows.write().await;
                    if let Some(wf) = workflows.get_mut(&id) {
                        wf.pause_for_gate(request);
                    }
                }
                info!(workflow_id = %id, gate_id, step = index, "Workflow paused on gate");
                self.event_bus.publish(
                    EventSeverity::Info,
                    EventCategory::Workflow,
                    EventPayload::WorkflowPaused {
                        workflow_id: id,
                        gate_id,
                        step_index: index,
                    },
                );
                GateOutcome::Paused
            }
        }
    }

    /// Run one step's handler under its deadline. Returns false when the
    /// workflow stopped (failure or cancellation observed).
    async fn run_step(
        &self,
        id: Uuid,
        index: usize,
        step: &StepDefinition,
        mut context: HashMap<String, Value>,
    ) -> bool {
        let handler = self.handlers.read().await.get(&step.step_type).cloned();
        let Some(handler) = handler else {
            self.finish_workflow(
                id,
                WorkflowStatus::Failed,
                Some(format!("No handler registered for step type '{}'", step.step_type)),
            )
            .await;
            return false;
        };

        let deadline_ms = step.timeout_ms.unwrap_or(self.settings.step_timeout_ms);
        let workflow_id = id.to_string();
        let ctx = StepContext {
            workflow_id: &workflow_id,
            step_index: index,
            context: &mut context,
        };

        let outcome = timeout(Duration::from_millis(deadline_ms), handler.execute(ctx, &step.params)).await;

        let result = match outcome {
            Err(_) => {
                warn!(workflow_id = %id, step = index, deadline_ms, "Step timed out");
                self.finish_workflow(
                    id,
                    WorkflowStatus::Failed,
                    Some(DomainError::Timeout(deadline_ms).to_string()),
                )
                .await;
                return false;
            }
            Ok(Err(e)) => {
                error!(workflow_id = %id, step = index, error = %e, "Step failed");
                self.finish_workflow(id, WorkflowStatus::Failed, Some(e.to_string())).await;
                return false;
            }
            Ok(Ok(value)) => value,
        };

        // Record the result; discard it if the workflow was cancelled while
        // the handler ran.
        let mut workflows = self.workflows.write().await;
        let Some(wf) = workflows.get_mut(&id) else {
            return false;
        };
        if wf.status != WorkflowStatus::Running {
            debug!(workflow_id = %id, status = %wf.status, "Discarding result of stopped workflow");
            return false;
        }
        debug_assert_eq!(wf.step_results.len(), index);
        wf.step_results.push(result);
        wf.context = context;
        true
    }

    /// Terminal transition: set end time, leave the active set, emit, persist.
    async fn finish_workflow(&self, id: Uuid, status: WorkflowStatus, error: Option<String>) {
        {
            let mut workflows = self.workflows.write().await;
            let Some(wf) = workflows.get_mut(&id) else {
                return;
            };
            if wf.status.is_terminal() {
                return;
            }
            wf.finish(status, error.clone());
        }
        self.active.write().await.remove(&id);

        let payload = match status {
            WorkflowStatus::Completed => EventPayload::WorkflowCompleted { workflow_id: id },
            WorkflowStatus::Cancelled => EventPayload::WorkflowCancelled { workflow_id: id },
            _ => EventPayload::WorkflowFailed {
                workflow_id: id,
                error: error.unwrap_or_default(),
            },
        };
        let severity = if status == WorkflowStatus::Completed {
            EventSeverity::Info
        } else {
            EventSeverity::Warning
        };
        self.event_bus.publish(severity, EventCategory::Workflow, payload);
        self.persist(id).await;
    }

    /// Persist a workflow snapshot when persistence is enabled.
    async fn persist(&self, id: Uuid) {
        if !self.settings.persist_workflows {
            return;
        }
        let snapshot = self.workflows.read().await.get(&id).cloned();
        if let Some(wf) = snapshot {
            match serde_json::to_value(&wf) {
                Ok(value) => {
                    let receipt = self
                        .kv
                        .store(&id.to_string(), value, &self.settings.persistence_namespace)
                        .await;
                    if !receipt.is_success() {
                        warn!(workflow_id = %id, "Workflow persistence failed");
                    }
                }
                Err(e) => warn!(workflow_id = %id, error = %e, "Workflow serialization failed"),
            }
        }
    }
}

/// Gate evaluation outcome, internal to the driver.
enum GateOutcome {
    Approved,
    Paused,
    Rejected,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::InMemoryKvStore;
    use serde_json::json;

    fn engine() -> Arc<WorkflowEngine> {
        Arc::new(WorkflowEngine::new(
            WorkflowSettings::default(),
            Arc::new(InMemoryKvStore::new()),
            Arc::new(EventBus::default()),
        ))
    }

    fn log_definition(name: &str) -> WorkflowDefinition {
        WorkflowDefinition::new(name)
            .with_step(StepDefinition::new("log").with_params(json!({"message": "hi"})))
    }

    #[tokio::test]
    async fn test_unknown_definition_name() {
        let engine = engine();
        let err = engine
            .start_workflow("missing", HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::DefinitionNotFound(_)));
    }

    #[tokio::test]
    async fn test_simple_workflow_completes() {
        let engine = engine();
        let id = engine
            .start_workflow(log_definition("simple"), HashMap::new())
            .await
            .unwrap();

        let wf = engine.wait_for_settled(id).await.unwrap();
        assert_eq!(wf.status, WorkflowStatus::Completed);
        assert_eq!(wf.step_results, vec![json!({"logged": "hi"})]);
        assert!(wf.ended_at.is_some());
        assert_eq!(engine.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_registered_definition_by_name() {
        let engine = engine();
        engine
            .register_definition(log_definition("named"))
            .await
            .unwrap();
        assert_eq!(engine.definition_names().await, vec!["named".to_string()]);

        let id = engine.start_workflow("named", HashMap::new()).await.unwrap();
        let wf = engine.wait_for_settled(id).await.unwrap();
        assert_eq!(wf.status, WorkflowStatus::Completed);
    }

    #[tokio::test]
    async fn test_concurrency_limit() {
        let engine = Arc::new(WorkflowEngine::new(
            WorkflowSettings {
                max_concurrent: 1,
                ..WorkflowSettings::default()
            },
            Arc::new(InMemoryKvStore::new()),
            Arc::new(EventBus::default()),
        ));

        // A paused workflow occupies the active slot indefinitely.
        let gated = WorkflowDefinition::new("gated").with_step(
            StepDefinition::new("log")
                .with_params(json!({"message": "held"}))
                .with_gate(GateConfig::default()),
        );
        let first = engine.start_workflow(gated, HashMap::new()).await.unwrap();
        let wf = engine.wait_for_settled(first).await.unwrap();
        assert_eq!(wf.status, WorkflowStatus::Paused);

        let err = engine
            .start_workflow(log_definition("second"), HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ConcurrencyLimit { .. }));
        // The active set is unchanged.
        assert_eq!(engine.active_count().await, 1);
    }

    #[tokio::test]
    async fn test_step_timeout_zero_fails_immediately() {
        let engine = engine();
        let definition = WorkflowDefinition::new("instant-timeout").with_step(
            StepDefinition::new("delay")
                .with_params(json!({"duration_ms": 5000}))
                .with_timeout_ms(0),
        );
        let id = engine.start_workflow(definition, HashMap::new()).await.unwrap();
        let wf = engine.wait_for_settled(id).await.unwrap();
        assert_eq!(wf.status, WorkflowStatus::Failed);
        assert!(wf.error.unwrap().contains("Timed out"));
    }

    #[tokio::test]
    async fn test_cancel_semantics() {
        let engine = engine();
        let id = engine
            .start_workflow(log_definition("to-cancel"), HashMap::new())
            .await
            .unwrap();
        engine.wait_for_settled(id).await.unwrap();

        // Cancelling a terminal workflow returns false.
        assert!(!engine.cancel_workflow(id).await);
        // Cancelling an unknown workflow returns false.
        assert!(!engine.cancel_workflow(Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn test_auto_approval_never_pauses() {
        let engine = engine();
        let definition = WorkflowDefinition::new("auto").with_step(
            StepDefinition::new("log")
                .with_params(json!({"message": "auto"}))
                .with_gate(GateConfig {
                    auto_approval: true,
                    ..GateConfig::default()
                }),
        );
        let id = engine.start_workflow(definition, HashMap::new()).await.unwrap();
        let wf = engine.wait_for_settled(id).await.unwrap();
        assert_eq!(wf.status, WorkflowStatus::Completed);
        assert!(wf.gate_results.values().all(|g| g.approved && g.auto));
    }

    #[tokio::test]
    async fn test_missing_handler_fails_workflow() {
        let engine = engine();
        let definition =
            WorkflowDefinition::new("nohandler").with_step(StepDefinition::new("does-not-exist"));
        let id = engine.start_workflow(definition, HashMap::new()).await.unwrap();
        let wf = engine.wait_for_settled(id).await.unwrap();
        assert_eq!(wf.status, WorkflowStatus::Failed);
        assert!(wf.error.unwrap().contains("No handler registered"));
    }

    #[tokio::test]
    async fn test_resume_rejects_wrong_gate() {
        let engine = engine();
        let definition = WorkflowDefinition::new("gated").with_step(
            StepDefinition::new("log")
                .with_params(json!({"message": "held"}))
                .with_gate(GateConfig::default()),
        );
        let id = engine.start_workflow(definition, HashMap::new()).await.unwrap();
        let wf = engine.wait_for_settled(id).await.unwrap();
        assert_eq!(wf.status, WorkflowStatus::Paused);

        let err = engine
            .resume_after_gate(id, "gate-wrong", true)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::PreconditionFailed(_)));
    }
}

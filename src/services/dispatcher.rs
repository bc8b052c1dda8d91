//! Capability-scored task dispatch.
//!
//! `assign` filters idle agents that cover the task's requirements, then
//! picks the agent with the highest dispatch score, breaking ties by lowest
//! id. `complete` is idempotent and is the only path that updates agent
//! performance counters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{AgentStatus, Assignment, TaskSpec};
use crate::services::agent_registry::AgentRegistry;
use crate::services::event_bus::{EventBus, EventCategory, EventPayload, EventSeverity};

/// Dispatcher over the agent registry.
pub struct TaskDispatcher {
    registry: Arc<AgentRegistry>,
    event_bus: Arc<EventBus>,
    /// In-flight assignments keyed by task id.
    assignments: RwLock<HashMap<String, Assignment>>,
    total_assigned: AtomicU64,
    total_completed: AtomicU64,
}

impl TaskDispatcher {
    pub fn new(registry: Arc<AgentRegistry>, event_bus: Arc<EventBus>) -> Self {
        Self {
            registry,
            event_bus,
            assignments: RwLock::new(HashMap::new()),
            total_assigned: AtomicU64::new(0),
            total_completed: AtomicU64::new(0),
        }
    }

    /// Assign the best-fitting idle agent to the task.
    ///
    /// Returns `Ok(None)` when no idle agent covers the requirements; this
    /// is not an error. Re-assigning an already-assigned task violates the
    /// single-assignment invariant and is rejected.
    #[instrument(skip(self, task), fields(task_id = %task.id))]
    pub async fn assign(&self, task: &TaskSpec) -> DomainResult<Option<String>> {
        task.validate().map_err(DomainError::ValidationFailed)?;

        if self.assignments.read().await.contains_key(&task.id) {
            return Err(DomainError::PreconditionFailed(format!(
                "Task {} is already assigned",
                task.id
            )));
        }

        // Snapshot is ordered by id, so scanning with a strictly-greater
        // comparison breaks score ties toward the lowest id.
        let snapshot = self.registry.snapshot().await;
        let mut best: Option<(f64, String)> = None;
        for agent in &snapshot {
            if !agent.status.is_available() || !agent.covers(&task.requirements) {
                continue;
            }
            let score = agent.performance.dispatch_score();
            if best.as_ref().is_none_or(|(s, _)| score > *s) {
                best = Some((score, agent.id.clone()));
            }
        }

        let Some((score, agent_id)) = best else {
            debug!("No suitable agent for task");
            return Ok(None);
        };

        // Claim under the registry write lock; a concurrent assign may have
        // taken the agent since the snapshot.
        let mut claimed = false;
        self.registry
            .update(&agent_id, |a| {
                if a.status == AgentStatus::Idle {
                    a.status = AgentStatus::Busy;
                    claimed = true;
                }
            })
            .await?;
        if !claimed {
            // Lost the race; the caller can retry.
            debug!(agent_id, "Candidate agent no longer idle");
            return Ok(None);
        }

        self.assignments
            .write()
            .await
            .insert(task.id.clone(), Assignment::new(task.clone(), &agent_id));
        self.total_assigned.fetch_add(1, Ordering::SeqCst);

        info!(agent_id, score, "Assigned task");
        self.event_bus.publish(
            EventSeverity::Info,
            EventCategory::Task,
            EventPayload::TaskAssigned {
                task_id: task.id.clone(),
                agent_id: agent_id.clone(),
            },
        );

        Ok(Some(agent_id))
    }

    /// Complete an assigned task.
    ///
    /// Flips the agent back to idle and folds the run into its rolling
    /// averages. Completing an unknown task is a silent no-op, which makes
    /// the call idempotent.
    #[instrument(skip(self, _result))]
    pub async fn complete(&self, task_id: &str, _result: Value) -> DomainResult<()> {
        let Some(assignment) = self.assignments.write().await.remove(task_id) else {
            debug!("Completion for unknown task ignored");
            return Ok(());
        };

        let duration_ms = assignment.elapsed_ms();
        let agent_id = assignment.agent_id.clone();
        let update = self
            .registry
            .update(&agent_id, |a| {
                a.status = AgentStatus::Idle;
                a.performance.record_completion(duration_ms);
            })
            .await;
        if let Err(e) = update {
            warn!(agent_id, error = %e, "Completion could not update agent");
        }

        self.total_completed.fetch_add(1, Ordering::SeqCst);
        self.event_bus.publish(
            EventSeverity::Info,
            EventCategory::Task,
            EventPayload::TaskCompleted {
                task_id: task_id.to_string(),
                agent_id,
                duration_ms,
            },
        );
        Ok(())
    }

    /// Complete an assigned task as failed.
    ///
    /// The agent still makes its single busy→idle transition; the failure
    /// is folded into its error rate.
    #[instrument(skip(self))]
    pub async fn complete_with_error(&self, task_id: &str, error: &str) -> DomainResult<()> {
        let Some(assignment) = self.assignments.write().await.remove(task_id) else {
            debug!("Failure for unknown task ignored");
            return Ok(());
        };

        let agent_id = assignment.agent_id.clone();
        let update = self
            .registry
            .update(&agent_id, |a| {
                a.status = AgentStatus::Idle;
                a.performance.record_error();
            })
            .await;
        if let Err(e) = update {
            warn!(agent_id, error = %e, "Failure could not update agent");
        }

        self.event_bus.publish(
            EventSeverity::Error,
            EventCategory::Task,
            EventPayload::CoordinationError {
                agent_id,
                error: format!("task {task_id} failed: {error}"),
            },
        );
        Ok(())
    }

    /// Snapshot of the in-flight assignment for a task, if any.
    pub async fn assignment(&self, task_id: &str) -> Option<Assignment> {
        self.assignments.read().await.get(task_id).cloned()
    }

    /// Number of in-flight assignments.
    pub async fn in_flight(&self) -> usize {
        self.assignments.read().await.len()
    }

    /// Total tasks ever assigned.
    pub fn total_assigned(&self) -> u64 {
        self.total_assigned.load(Ordering::SeqCst)
    }

    /// Total tasks completed successfully.
    pub fn total_completed(&self) -> u64 {
        self.total_completed.load(Ordering::SeqCst)
    }
}

//! Broadcast event bus.
//!
//! Services publish coordination observations here; subscribers receive a
//! live stream. Publishing never blocks and never fails: with no active
//! subscribers events are dropped.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Event severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Event category for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Agent,
    Task,
    Coordination,
    Workflow,
    Phase,
}

/// Event payload variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    AgentRegistered { agent_id: String },
    AgentRemoved { agent_id: String },
    TaskAssigned { task_id: String, agent_id: String },
    TaskCompleted { task_id: String, agent_id: String, duration_ms: f64 },
    CoordinationError { agent_id: String, error: String },
    WorkflowStarted { workflow_id: Uuid, name: String },
    WorkflowPaused { workflow_id: Uuid, gate_id: String, step_index: usize },
    WorkflowResumed { workflow_id: Uuid, gate_id: String },
    WorkflowCompleted { workflow_id: Uuid },
    WorkflowFailed { workflow_id: Uuid, error: String },
    WorkflowCancelled { workflow_id: Uuid },
    PhaseStarted { project_id: Uuid, phase: String },
    PhaseCompleted { project_id: Uuid, phase: String },
    PhaseFailed { project_id: Uuid, phase: String, error: String },
}

/// An event on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    /// Monotonic sequence number assigned at publish time.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub severity: EventSeverity,
    pub category: EventCategory,
    pub payload: EventPayload,
}

/// Event bus configuration.
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Broadcast channel capacity; slow subscribers lag past this.
    pub capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

/// Broadcast-based event bus with sequence numbering.
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: AtomicU64,
}

impl EventBus {
    pub fn new(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.capacity);
        Self {
            sender,
            sequence: AtomicU64::new(0),
        }
    }

    /// Publish an event, assigning its sequence number.
    pub fn publish(&self, severity: EventSeverity, category: EventCategory, payload: EventPayload) {
        let event = Event {
            id: Uuid::new_v4(),
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            timestamp: Utc::now(),
            severity,
            category,
            payload,
        };
        // Send fails only when there are no subscribers; that is fine.
        let _ = self.sender.send(event);
    }

    /// Subscribe to the live event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Number of events published so far.
    pub fn published_count(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EventBusConfig::default())
    }
}

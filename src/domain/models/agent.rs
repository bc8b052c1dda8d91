//! Agent domain model.
//!
//! Agents are worker entities held in the swarm registry. The dispatcher is
//! the only component that mutates their status; task completion is the only
//! path that updates their performance counters.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed taxonomy of agent types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    Researcher,
    Coder,
    Analyst,
    Tester,
    Coordinator,
    Architect,
    Debugger,
    Reviewer,
    Optimizer,
    Documenter,
}

impl Default for AgentType {
    fn default() -> Self {
        Self::Coder
    }
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Researcher => "researcher",
            Self::Coder => "coder",
            Self::Analyst => "analyst",
            Self::Tester => "tester",
            Self::Coordinator => "coordinator",
            Self::Architect => "architect",
            Self::Debugger => "debugger",
            Self::Reviewer => "reviewer",
            Self::Optimizer => "optimizer",
            Self::Documenter => "documenter",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "researcher" => Some(Self::Researcher),
            "coder" => Some(Self::Coder),
            "analyst" => Some(Self::Analyst),
            "tester" => Some(Self::Tester),
            "coordinator" => Some(Self::Coordinator),
            "architect" => Some(Self::Architect),
            "debugger" => Some(Self::Debugger),
            "reviewer" => Some(Self::Reviewer),
            "optimizer" => Some(Self::Optimizer),
            "documenter" => Some(Self::Documenter),
            _ => None,
        }
    }
}

/// Status of an agent in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Available for dispatch.
    Idle,
    /// Executing an assigned task.
    Busy,
    /// Faulted; skipped by dispatch until explicitly reset to idle.
    Error,
    /// Not participating in the swarm.
    Offline,
}

impl Default for AgentStatus {
    fn default() -> Self {
        Self::Idle
    }
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Busy => "busy",
            Self::Error => "error",
            Self::Offline => "offline",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "idle" => Some(Self::Idle),
            "busy" => Some(Self::Busy),
            "error" => Some(Self::Error),
            "offline" => Some(Self::Offline),
            _ => None,
        }
    }

    /// Active means participating in the swarm (idle or busy).
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Idle | Self::Busy)
    }

    /// Available for a new assignment.
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Rolling performance counters for an agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentPerformance {
    /// Number of successfully completed tasks.
    pub tasks_completed: u64,
    /// Rolling average response time in milliseconds.
    pub avg_response_ms: f64,
    /// Fraction of runs that errored, in [0, 1].
    pub error_rate: f64,
}

impl AgentPerformance {
    /// Fold a successful completion into the rolling averages.
    ///
    /// The average is weighted over the prior completion count, then the
    /// count is incremented. The error rate denominator follows the same
    /// count so both aggregates stay in step.
    pub fn record_completion(&mut self, duration_ms: f64) {
        let n = self.tasks_completed as f64;
        self.avg_response_ms = (self.avg_response_ms * n + duration_ms) / (n + 1.0);
        self.error_rate = (self.error_rate * n) / (n + 1.0);
        self.tasks_completed += 1;
    }

    /// Fold a failed run into the error rate.
    pub fn record_error(&mut self) {
        let n = self.tasks_completed as f64;
        self.error_rate = (self.error_rate * n + 1.0) / (n + 1.0);
        self.tasks_completed += 1;
    }

    /// Dispatch score: higher is better.
    ///
    /// `tasks_completed − 100·error_rate − avg_response_ms/1000`
    pub fn dispatch_score(&self) -> f64 {
        self.tasks_completed as f64 - 100.0 * self.error_rate - self.avg_response_ms / 1000.0
    }
}

/// A worker agent registered with the swarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Caller-supplied unique identifier.
    pub id: String,
    /// Agent type from the fixed taxonomy.
    pub agent_type: AgentType,
    /// Current status.
    pub status: AgentStatus,
    /// Capability strings this agent offers.
    pub capabilities: BTreeSet<String>,
    /// Rolling performance counters.
    pub performance: AgentPerformance,
    /// Informational peer connections.
    pub connections: BTreeSet<String>,
    /// When the agent was registered.
    pub registered_at: DateTime<Utc>,
    /// When the agent was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    /// Create a new idle agent.
    pub fn new(id: impl Into<String>, agent_type: AgentType) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            agent_type,
            status: AgentStatus::Idle,
            capabilities: BTreeSet::new(),
            performance: AgentPerformance::default(),
            connections: BTreeSet::new(),
            registered_at: now,
            updated_at: now,
        }
    }

    /// Add a capability.
    pub fn with_capability(mut self, cap: impl Into<String>) -> Self {
        self.capabilities.insert(cap.into());
        self
    }

    /// Add several capabilities at once.
    pub fn with_capabilities<I, S>(mut self, caps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities.extend(caps.into_iter().map(Into::into));
        self
    }

    /// Add a peer connection.
    pub fn with_connection(mut self, peer: impl Into<String>) -> Self {
        self.connections.insert(peer.into());
        self
    }

    /// Set an initial status (builder, for tests and seeding).
    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = status;
        self
    }

    /// Whether this agent can satisfy every required capability.
    pub fn covers(&self, requirements: &BTreeSet<String>) -> bool {
        requirements.iter().all(|r| self.capabilities.contains(r))
    }

    /// Validate the agent record.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Agent id cannot be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_creation() {
        let agent = Agent::new("a1", AgentType::Coder)
            .with_capability("web")
            .with_capability("parse");

        assert_eq!(agent.id, "a1");
        assert_eq!(agent.status, AgentStatus::Idle);
        assert!(agent.capabilities.contains("web"));
        assert!(agent.validate().is_ok());
    }

    #[test]
    fn test_agent_covers_requirements() {
        let agent = Agent::new("a1", AgentType::Coder).with_capabilities(["web", "parse"]);

        let mut reqs = BTreeSet::new();
        reqs.insert("web".to_string());
        assert!(agent.covers(&reqs));

        reqs.insert("parse".to_string());
        assert!(agent.covers(&reqs));

        reqs.insert("ml".to_string());
        assert!(!agent.covers(&reqs));
    }

    #[test]
    fn test_rolling_average() {
        let mut perf = AgentPerformance::default();
        perf.record_completion(200.0);
        assert_eq!(perf.tasks_completed, 1);
        assert!((perf.avg_response_ms - 200.0).abs() < f64::EPSILON);

        perf.record_completion(100.0);
        assert_eq!(perf.tasks_completed, 2);
        assert!((perf.avg_response_ms - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_error_rate_accounting() {
        let mut perf = AgentPerformance::default();
        perf.record_completion(100.0);
        perf.record_error();
        assert!((perf.error_rate - 0.5).abs() < 1e-9);

        perf.record_completion(100.0);
        assert!((perf.error_rate - (1.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_dispatch_score() {
        let mut perf = AgentPerformance {
            tasks_completed: 5,
            avg_response_ms: 100.0,
            error_rate: 0.0,
        };
        assert!((perf.dispatch_score() - 4.9).abs() < 1e-9);

        perf.error_rate = 0.1;
        assert!(perf.dispatch_score() < 4.9);
    }

    #[test]
    fn test_status_predicates() {
        assert!(AgentStatus::Idle.is_active());
        assert!(AgentStatus::Busy.is_active());
        assert!(!AgentStatus::Offline.is_active());
        assert!(!AgentStatus::Error.is_active());

        assert!(AgentStatus::Idle.is_available());
        assert!(!AgentStatus::Busy.is_available());
    }

    #[test]
    fn test_type_round_trip() {
        for t in [
            AgentType::Researcher,
            AgentType::Coder,
            AgentType::Architect,
            AgentType::Debugger,
        ] {
            assert_eq!(AgentType::parse_str(t.as_str()), Some(t));
        }
        assert_eq!(AgentType::parse_str("unknown"), None);
    }
}

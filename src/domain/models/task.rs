//! Task domain model.
//!
//! A `TaskSpec` is a request for work that names the capabilities it needs;
//! the dispatcher turns it into an `Assignment` against exactly one agent.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task priority on a 1..=10 scale with named levels.
///
/// Named levels map onto the scale: low=3, medium=5, high=8, critical=10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(u8);

impl Priority {
    pub const LOW: Priority = Priority(3);
    pub const MEDIUM: Priority = Priority(5);
    pub const HIGH: Priority = Priority(8);
    pub const CRITICAL: Priority = Priority(10);

    /// Build from a raw 1..=10 value; out-of-range values are clamped.
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 10))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Elevated priorities (high, critical) trigger structured routing.
    pub fn is_elevated(&self) -> bool {
        *self >= Self::HIGH
    }

    pub fn as_str(&self) -> &'static str {
        match self.0 {
            0..=3 => "low",
            4..=6 => "medium",
            7..=9 => "high",
            _ => "critical",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::LOW),
            "medium" | "normal" => Some(Self::MEDIUM),
            "high" => Some(Self::HIGH),
            "critical" => Some(Self::CRITICAL),
            other => other.parse::<u8>().ok().map(Self::new),
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::MEDIUM
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.0)
    }
}

/// A request for work against the swarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Caller-supplied unique identifier.
    pub id: String,
    /// Logical task type (free-form, e.g. "analysis", "build").
    pub task_type: String,
    /// What the task should accomplish.
    pub description: String,
    /// Priority on the 1..=10 scale.
    pub priority: Priority,
    /// Capability strings a candidate agent must cover.
    pub requirements: BTreeSet<String>,
    /// Optional deadline.
    pub deadline: Option<DateTime<Utc>>,
    /// Task ids this task depends on.
    pub dependencies: Vec<String>,
    /// When the spec was created.
    pub created_at: DateTime<Utc>,
}

impl TaskSpec {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            task_type: "general".to_string(),
            description: description.into(),
            priority: Priority::default(),
            requirements: BTreeSet::new(),
            deadline: None,
            dependencies: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = task_type.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_requirement(mut self, cap: impl Into<String>) -> Self {
        self.requirements.insert(cap.into());
        self
    }

    pub fn with_requirements<I, S>(mut self, caps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requirements.extend(caps.into_iter().map(Into::into));
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_dependency(mut self, task_id: impl Into<String>) -> Self {
        let task_id = task_id.into();
        if task_id != self.id && !self.dependencies.contains(&task_id) {
            self.dependencies.push(task_id);
        }
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Task id cannot be empty".to_string());
        }
        if self.description.trim().is_empty() {
            return Err("Task description cannot be empty".to_string());
        }
        if self.dependencies.contains(&self.id) {
            return Err("Task cannot depend on itself".to_string());
        }
        Ok(())
    }
}

/// An in-flight binding of a task to exactly one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// The task being worked.
    pub task: TaskSpec,
    /// The busy agent holding the task.
    pub agent_id: String,
    /// When the assignment started.
    pub started_at: DateTime<Utc>,
}

impl Assignment {
    pub fn new(task: TaskSpec, agent_id: impl Into<String>) -> Self {
        Self {
            task,
            agent_id: agent_id.into(),
            started_at: Utc::now(),
        }
    }

    /// Elapsed time since the assignment started, in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        (Utc::now() - self.started_at).num_milliseconds().max(0) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_named_levels() {
        assert_eq!(Priority::LOW.value(), 3);
        assert_eq!(Priority::MEDIUM.value(), 5);
        assert_eq!(Priority::HIGH.value(), 8);
        assert_eq!(Priority::CRITICAL.value(), 10);
    }

    #[test]
    fn test_priority_clamp() {
        assert_eq!(Priority::new(0).value(), 1);
        assert_eq!(Priority::new(15).value(), 10);
        assert_eq!(Priority::new(7).value(), 7);
    }

    #[test]
    fn test_priority_elevated() {
        assert!(!Priority::LOW.is_elevated());
        assert!(!Priority::MEDIUM.is_elevated());
        assert!(Priority::HIGH.is_elevated());
        assert!(Priority::CRITICAL.is_elevated());
        assert!(!Priority::new(7).is_elevated());
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!(Priority::parse_str("low"), Some(Priority::LOW));
        assert_eq!(Priority::parse_str("CRITICAL"), Some(Priority::CRITICAL));
        assert_eq!(Priority::parse_str("7"), Some(Priority::new(7)));
        assert_eq!(Priority::parse_str("nope"), None);
    }

    #[test]
    fn test_task_spec_builder() {
        let task = TaskSpec::new("t1", "Parse the web page")
            .with_type("parse")
            .with_priority(Priority::HIGH)
            .with_requirements(["web", "parse"])
            .with_dependency("t0");

        assert_eq!(task.id, "t1");
        assert_eq!(task.requirements.len(), 2);
        assert_eq!(task.dependencies, vec!["t0".to_string()]);
        assert!(task.validate().is_ok());
    }

    #[test]
    fn test_task_self_dependency_ignored() {
        let task = TaskSpec::new("t1", "desc").with_dependency("t1");
        assert!(task.dependencies.is_empty());
    }

    #[test]
    fn test_task_validation() {
        assert!(TaskSpec::new("", "desc").validate().is_err());
        assert!(TaskSpec::new("t1", "  ").validate().is_err());
        assert!(TaskSpec::new("t1", "ok").validate().is_ok());
    }
}

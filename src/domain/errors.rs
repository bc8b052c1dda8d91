//! Domain errors for the Chorus coordination kernel.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur in the Chorus system.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Agent already exists: {0}")]
    AgentAlreadyExists(String),

    #[error("Agent {0} is busy with an assigned task")]
    AgentBusy(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Workflow not found: {0}")]
    WorkflowNotFound(Uuid),

    #[error("Workflow definition not found: {0}")]
    DefinitionNotFound(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(Uuid),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Timed out after {0} ms")]
    Timeout(u64),

    #[error("Concurrency limit reached: {active} active workflows (max {max})")]
    ConcurrencyLimit { active: usize, max: usize },

    #[error("Gate rejected: {0}")]
    GateRejected(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

impl DomainError {
    /// Short machine-readable kind, used in tool envelopes and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AgentNotFound(_)
            | Self::TaskNotFound(_)
            | Self::WorkflowNotFound(_)
            | Self::DefinitionNotFound(_)
            | Self::ProjectNotFound(_)
            | Self::TemplateNotFound(_) => "not_found",
            Self::AgentAlreadyExists(_) => "already_exists",
            Self::AgentBusy(_) => "busy",
            Self::PreconditionFailed(_) => "precondition_failed",
            Self::Timeout(_) => "timeout",
            Self::ConcurrencyLimit { .. } => "concurrency_limit",
            Self::GateRejected(_) => "gate_rejected",
            Self::ValidationFailed(_) => "validation_failed",
            Self::Backend(_) => "backend",
            Self::Serialization(_) => "serialization",
            Self::Cancelled => "cancelled",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(DomainError::AgentNotFound("a1".into()).kind(), "not_found");
        assert_eq!(
            DomainError::AgentAlreadyExists("a1".into()).kind(),
            "already_exists"
        );
        assert_eq!(
            DomainError::ConcurrencyLimit { active: 10, max: 10 }.kind(),
            "concurrency_limit"
        );
        assert_eq!(DomainError::Timeout(30_000).kind(), "timeout");
    }

    #[test]
    fn test_display_messages() {
        let err = DomainError::GateRejected("gate-1".into());
        assert!(err.to_string().contains("Gate rejected"));

        let err = DomainError::ConcurrencyLimit { active: 3, max: 3 };
        assert!(err.to_string().contains("3 active"));
    }
}

//! Agent execution runtime port.
//!
//! Actually running an agent (an LLM session, a subprocess, a remote worker)
//! is outside the kernel. The task coordinator drives assigned work through
//! this port; the default runtime acknowledges the work with a structured
//! record so the kernel is fully exercisable without an external executor.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::errors::DomainResult;

/// Context handed to the runtime for one task execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// The prompt describing the work.
    pub prompt: String,
    /// Domain context assembled by the coordinator.
    pub domain_context: String,
    /// What output shape is expected.
    pub expected_output: String,
    /// System prompt for the selected specialization.
    pub system_prompt: String,
    /// Agent id the work is assigned to.
    pub agent_id: String,
    /// Resolved sub-agent specialization.
    pub subagent_type: String,
}

/// Output of one runtime execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeOutput {
    pub output: Value,
    /// Tools the runtime reports using.
    pub tools_used: Vec<String>,
}

/// Port for executing an assigned agent.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    async fn execute(&self, ctx: &ExecutionContext) -> DomainResult<RuntimeOutput>;
}

/// Default runtime: acknowledges the work without external execution.
#[derive(Debug, Default, Clone)]
pub struct NullAgentRuntime;

#[async_trait]
impl AgentRuntime for NullAgentRuntime {
    async fn execute(&self, ctx: &ExecutionContext) -> DomainResult<RuntimeOutput> {
        Ok(RuntimeOutput {
            output: json!({
                "acknowledged": true,
                "agent": &ctx.agent_id,
                "subagent_type": &ctx.subagent_type,
            }),
            tools_used: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_runtime_acknowledges() {
        let runtime = NullAgentRuntime;
        let ctx = ExecutionContext {
            prompt: "do the thing".into(),
            domain_context: String::new(),
            expected_output: String::new(),
            system_prompt: String::new(),
            agent_id: "a1".into(),
            subagent_type: "coder".into(),
        };
        let out = runtime.execute(&ctx).await.unwrap();
        assert_eq!(out.output["acknowledged"], true);
        assert_eq!(out.output["agent"], "a1");
    }
}

//! Workflow step handler port.
//!
//! The workflow engine dispatches each step to a late-bound handler keyed by
//! the step's type. Handlers receive the workflow context and the step's
//! params and may suspend.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::errors::DomainResult;

/// Mutable view a handler gets of the running workflow.
#[derive(Debug)]
pub struct StepContext<'a> {
    /// Workflow id as a string, for logging.
    pub workflow_id: &'a str,
    /// Index of the step being executed.
    pub step_index: usize,
    /// Shared workflow context; handlers may read and mutate it.
    pub context: &'a mut HashMap<String, Value>,
}

/// A workflow step handler.
#[async_trait]
pub trait StepHandler: Send + Sync {
    /// Step type this handler serves, used as the registry key.
    fn step_type(&self) -> &str;

    /// Execute the step, returning its result value.
    async fn execute(&self, ctx: StepContext<'_>, params: &Value) -> DomainResult<Value>;
}

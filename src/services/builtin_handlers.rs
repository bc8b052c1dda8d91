//! Built-in workflow step handlers.
//!
//! Three handlers ship with the engine: `delay` sleeps for a duration, `log`
//! records a message, and `transform` applies an operation to a nested
//! context path. All are registered by default on every engine.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{StepContext, StepHandler};

/// Sleep for `duration_ms` (or legacy `duration`) milliseconds.
#[derive(Debug, Default)]
pub struct DelayHandler;

impl DelayHandler {
    fn duration_ms(params: &Value) -> u64 {
        params
            .get("duration_ms")
            .or_else(|| params.get("duration"))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }
}

#[async_trait]
impl StepHandler for DelayHandler {
    fn step_type(&self) -> &str {
        "delay"
    }

    async fn execute(&self, ctx: StepContext<'_>, params: &Value) -> DomainResult<Value> {
        let ms = Self::duration_ms(params);
        debug!(workflow_id = ctx.workflow_id, step = ctx.step_index, ms, "delay step");
        tokio::time::sleep(tokio::time::Duration::from_millis(ms)).await;
        Ok(json!({ "delayed": ms }))
    }
}

/// Record a message at the requested level.
#[derive(Debug, Default)]
pub struct LogHandler;

#[async_trait]
impl StepHandler for LogHandler {
    fn step_type(&self) -> &str {
        "log"
    }

    async fn execute(&self, ctx: StepContext<'_>, params: &Value) -> DomainResult<Value> {
        let message = params
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let level = params.get("level").and_then(Value::as_str).unwrap_or("info");

        match level {
            "warn" => warn!(workflow_id = ctx.workflow_id, step = ctx.step_index, "{message}"),
            "debug" => debug!(workflow_id = ctx.workflow_id, step = ctx.step_index, "{message}"),
            _ => info!(workflow_id = ctx.workflow_id, step = ctx.step_index, "{message}"),
        }
        Ok(json!({ "logged": message }))
    }
}

/// Apply an operation to a nested context path.
///
/// Params: `path` ("a.b.c" into the workflow context), `operation`
/// (`uppercase`, `lowercase`, `increment`, `set`), and `value` for `set`.
#[derive(Debug, Default)]
pub struct TransformHandler;

impl TransformHandler {
    /// Navigate to the value at `path`, mutably. The first segment indexes
    /// the context map, remaining segments index nested objects.
    fn resolve_mut<'a>(
        context: &'a mut std::collections::HashMap<String, Value>,
        path: &str,
    ) -> Option<&'a mut Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = context.get_mut(first)?;
        for segment in segments {
            current = current.get_mut(segment)?;
        }
        Some(current)
    }

    fn apply(target: &mut Value, operation: &str, value: Option<&Value>) -> DomainResult<Value> {
        match operation {
            "uppercase" => {
                let s = target.as_str().ok_or_else(|| {
                    DomainError::ValidationFailed("uppercase requires a string target".into())
                })?;
                *target = Value::String(s.to_uppercase());
            }
            "lowercase" => {
                let s = target.as_str().ok_or_else(|| {
                    DomainError::ValidationFailed("lowercase requires a string target".into())
                })?;
                *target = Value::String(s.to_lowercase());
            }
            "increment" => {
                let n = target.as_f64().ok_or_else(|| {
                    DomainError::ValidationFailed("increment requires a numeric target".into())
                })?;
                *target = json!(n + 1.0);
            }
            "set" => {
                let value = value.ok_or_else(|| {
                    DomainError::ValidationFailed("set requires a value param".into())
                })?;
                *target = value.clone();
            }
            other => {
                return Err(DomainError::ValidationFailed(format!(
                    "Unknown transform operation: {other}"
                )));
            }
        }
        Ok(target.clone())
    }
}

#[async_trait]
impl StepHandler for TransformHandler {
    fn step_type(&self) -> &str {
        "transform"
    }

    async fn execute(&self, ctx: StepContext<'_>, params: &Value) -> DomainResult<Value> {
        let path = params
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| DomainError::ValidationFailed("transform requires a path param".into()))?
            .to_string();
        let operation = params
            .get("operation")
            .and_then(Value::as_str)
            .unwrap_or("set")
            .to_string();

        let target = Self::resolve_mut(ctx.context, &path).ok_or_else(|| {
            DomainError::ValidationFailed(format!("Context path not found: {path}"))
        })?;
        let value = Self::apply(target, &operation, params.get("value"))?;

        Ok(json!({
            "path": path,
            "operation": operation,
            "value": value,
        }))
    }
}

/// The handlers registered on every engine.
pub fn builtin_handlers() -> Vec<std::sync::Arc<dyn StepHandler>> {
    vec![
        std::sync::Arc::new(DelayHandler),
        std::sync::Arc::new(LogHandler),
        std::sync::Arc::new(TransformHandler),
    ]
}

//! Key-value persistence port.
//!
//! All backends expose this single namespaced API. Writes are atomic per
//! key; readers never observe partial writes. Store failures surface in the
//! returned receipt rather than as errors so callers can decide retry.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::errors::DomainResult;

/// Namespace used when callers do not supply one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Outcome of a store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreStatus {
    Success,
    Error,
}

/// Receipt returned from `store`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreReceipt {
    /// Receipt identifier.
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub status: StoreStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StoreReceipt {
    pub fn success() -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            status: StoreStatus::Success,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            status: StoreStatus::Error,
            error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StoreStatus::Success
    }
}

/// Aggregate statistics for a backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KvStats {
    pub entries: u64,
    pub size_bytes: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub namespaces: Vec<String>,
}

/// Namespaced key-value store port.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Store a value under `namespace/key`, overwriting any prior value.
    async fn store(&self, key: &str, value: Value, namespace: &str) -> StoreReceipt;

    /// Retrieve a value, `None` when absent.
    async fn retrieve(&self, key: &str, namespace: &str) -> DomainResult<Option<Value>>;

    /// Search keys within a namespace. `*` matches all keys; any other
    /// pattern matches as a substring of the key.
    async fn search(&self, pattern: &str, namespace: &str) -> DomainResult<HashMap<String, Value>>;

    /// Delete a key; returns whether it existed.
    async fn delete(&self, key: &str, namespace: &str) -> DomainResult<bool>;

    /// Namespaces currently holding at least one entry.
    async fn list_namespaces(&self) -> DomainResult<Vec<String>>;

    /// Aggregate statistics.
    async fn stats(&self) -> DomainResult<KvStats>;
}

/// Whether `key` matches `pattern` under the search contract.
pub fn key_matches(pattern: &str, key: &str) -> bool {
    pattern == "*" || key.contains(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_matching() {
        assert!(key_matches("*", "anything"));
        assert!(key_matches("task", "task-42"));
        assert!(key_matches("42", "task-42"));
        assert!(!key_matches("agent", "task-42"));
    }

    #[test]
    fn test_receipts() {
        assert!(StoreReceipt::success().is_success());
        let receipt = StoreReceipt::error("disk full");
        assert!(!receipt.is_success());
        assert_eq!(receipt.error.as_deref(), Some("disk full"));
    }
}

//! In-memory KV backend.
//!
//! Used as the default composition backend and in tests. State is lost on
//! process exit.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::domain::errors::DomainResult;
use crate::domain::ports::{key_matches, KvStats, KvStore, StoreReceipt};

#[derive(Default)]
struct MemoryState {
    namespaces: HashMap<String, HashMap<String, Value>>,
    last_modified: Option<DateTime<Utc>>,
}

/// In-process map behind a single lock.
#[derive(Default)]
pub struct InMemoryKvStore {
    state: RwLock<MemoryState>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn store(&self, key: &str, value: Value, namespace: &str) -> StoreReceipt {
        let mut state = self.state.write().await;
        state
            .namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
        state.last_modified = Some(Utc::now());
        StoreReceipt::success()
    }

    async fn retrieve(&self, key: &str, namespace: &str) -> DomainResult<Option<Value>> {
        let state = self.state.read().await;
        Ok(state
            .namespaces
            .get(namespace)
            .and_then(|ns| ns.get(key))
            .cloned())
    }

    async fn search(&self, pattern: &str, namespace: &str) -> DomainResult<HashMap<String, Value>> {
        let state = self.state.read().await;
        Ok(state
            .namespaces
            .get(namespace)
            .map(|ns| {
                ns.iter()
                    .filter(|(k, _)| key_matches(pattern, k))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete(&self, key: &str, namespace: &str) -> DomainResult<bool> {
        let mut state = self.state.write().await;
        let existed = state
            .namespaces
            .get_mut(namespace)
            .map(|ns| ns.remove(key).is_some())
            .unwrap_or(false);
        if existed {
            state.last_modified = Some(Utc::now());
        }
        Ok(existed)
    }

    async fn list_namespaces(&self) -> DomainResult<Vec<String>> {
        let state = self.state.read().await;
        let mut namespaces: Vec<String> = state
            .namespaces
            .iter()
            .filter(|(_, ns)| !ns.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        namespaces.sort();
        Ok(namespaces)
    }

    async fn stats(&self) -> DomainResult<KvStats> {
        let state = self.state.read().await;
        let entries: u64 = state.namespaces.values().map(|ns| ns.len() as u64).sum();
        let size_bytes: u64 = state
            .namespaces
            .values()
            .flat_map(|ns| ns.values())
            .map(|v| v.to_string().len() as u64)
            .sum();
        let mut namespaces: Vec<String> = state.namespaces.keys().cloned().collect();
        namespaces.sort();
        Ok(KvStats {
            entries,
            size_bytes,
            last_modified: state.last_modified,
            namespaces,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_store_retrieve_round_trip() {
        let store = InMemoryKvStore::new();
        let receipt = store.store("k1", json!({"v": 1}), "default").await;
        assert!(receipt.is_success());
        assert_eq!(
            store.retrieve("k1", "default").await.unwrap(),
            Some(json!({"v": 1}))
        );
        assert_eq!(store.retrieve("k1", "other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_search_wildcard_and_substring() {
        let store = InMemoryKvStore::new();
        store.store("task-1", json!(1), "tasks").await;
        store.store("task-2", json!(2), "tasks").await;
        store.store("agent-1", json!(3), "tasks").await;

        assert_eq!(store.search("*", "tasks").await.unwrap().len(), 3);
        assert_eq!(store.search("task", "tasks").await.unwrap().len(), 2);
        assert_eq!(store.search("missing", "tasks").await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryKvStore::new();
        store.store("k1", json!(1), "default").await;
        assert!(store.delete("k1", "default").await.unwrap());
        assert!(!store.delete("k1", "default").await.unwrap());
    }

    #[tokio::test]
    async fn test_stats_and_namespaces() {
        let store = InMemoryKvStore::new();
        store.store("a", json!(1), "ns1").await;
        store.store("b", json!(2), "ns2").await;

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.entries, 2);
        assert!(stats.size_bytes > 0);
        assert!(stats.last_modified.is_some());

        let namespaces = store.list_namespaces().await.unwrap();
        assert_eq!(namespaces, vec!["ns1".to_string(), "ns2".to_string()]);
    }
}

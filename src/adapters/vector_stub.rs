//! Vector-store stub backend.
//!
//! Placeholder for a real vector database integration. Values are held in
//! memory alongside a dimension tag so callers exercising the backend see
//! the same KV contract as the persistent stores.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::adapters::memory_store::InMemoryKvStore;
use crate::domain::errors::DomainResult;
use crate::domain::ports::{KvStats, KvStore, StoreReceipt};

/// Stubbed vector store delegating to an in-memory map.
pub struct VectorKvStore {
    inner: InMemoryKvStore,
    /// Embedding dimension this stub pretends to index with.
    dimension: usize,
}

impl VectorKvStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            inner: InMemoryKvStore::new(),
            dimension,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

impl Default for VectorKvStore {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl KvStore for VectorKvStore {
    async fn store(&self, key: &str, value: Value, namespace: &str) -> StoreReceipt {
        debug!(key, namespace, dimension = self.dimension, "vector stub store");
        self.inner.store(key, value, namespace).await
    }

    async fn retrieve(&self, key: &str, namespace: &str) -> DomainResult<Option<Value>> {
        self.inner.retrieve(key, namespace).await
    }

    async fn search(&self, pattern: &str, namespace: &str) -> DomainResult<HashMap<String, Value>> {
        // No similarity search in the stub; the substring contract applies.
        self.inner.search(pattern, namespace).await
    }

    async fn delete(&self, key: &str, namespace: &str) -> DomainResult<bool> {
        self.inner.delete(key, namespace).await
    }

    async fn list_namespaces(&self) -> DomainResult<Vec<String>> {
        self.inner.list_namespaces().await
    }

    async fn stats(&self) -> DomainResult<KvStats> {
        self.inner.stats().await
    }
}

//! Backend contract tests for the KV store port.
//!
//! Every backend must satisfy the same contract: store/retrieve round
//! trips, wildcard and substring search, idempotent delete, namespace
//! isolation, and statistics.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};

use chorus::adapters::{InMemoryKvStore, JsonFileKvStore, SqliteKvStore, VectorKvStore};
use chorus::adapters::sqlite::create_migrated_test_pool;
use chorus::domain::ports::KvStore;

async fn backends() -> (Vec<(&'static str, Arc<dyn KvStore>)>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let pool = create_migrated_test_pool().await.unwrap();
    let stores: Vec<(&'static str, Arc<dyn KvStore>)> = vec![
        ("memory", Arc::new(InMemoryKvStore::new())),
        ("json", Arc::new(JsonFileKvStore::new(dir.path(), 1024 * 1024))),
        ("sqlite", Arc::new(SqliteKvStore::new(pool))),
        ("vector", Arc::new(VectorKvStore::default())),
    ];
    (stores, dir)
}

#[tokio::test]
async fn round_trip_across_backends() {
    let (stores, _dir) = backends().await;
    for (name, store) in stores {
        let value = json!({"nested": {"n": 42}, "tags": ["a", "b"]});
        let receipt = store.store("key-1", value.clone(), "default").await;
        assert!(receipt.is_success(), "{name}: store failed");

        let loaded = store.retrieve("key-1", "default").await.unwrap();
        assert_eq!(loaded, Some(value), "{name}: round trip mismatch");

        assert_eq!(
            store.retrieve("key-1", "elsewhere").await.unwrap(),
            None,
            "{name}: namespaces must isolate"
        );
    }
}

#[tokio::test]
async fn last_writer_wins() {
    let (stores, _dir) = backends().await;
    for (name, store) in stores {
        store.store("k", json!(1), "ns").await;
        store.store("k", json!(2), "ns").await;
        assert_eq!(
            store.retrieve("k", "ns").await.unwrap(),
            Some(json!(2)),
            "{name}: last write must win"
        );
        assert_eq!(store.stats().await.unwrap().entries, 1, "{name}");
    }
}

#[tokio::test]
async fn search_contract() {
    let (stores, _dir) = backends().await;
    for (name, store) in stores {
        store.store("task-1", json!(1), "ns").await;
        store.store("task-2", json!(2), "ns").await;
        store.store("other", json!(3), "ns").await;

        let all: HashMap<String, Value> = store.search("*", "ns").await.unwrap();
        assert_eq!(all.len(), 3, "{name}: * matches all");

        let tasks = store.search("task", "ns").await.unwrap();
        assert_eq!(tasks.len(), 2, "{name}: substring match");

        let none = store.search("missing", "ns").await.unwrap();
        assert!(none.is_empty(), "{name}");
    }
}

#[tokio::test]
async fn delete_contract() {
    let (stores, _dir) = backends().await;
    for (name, store) in stores {
        store.store("k", json!(1), "ns").await;
        assert!(store.delete("k", "ns").await.unwrap(), "{name}");
        assert!(!store.delete("k", "ns").await.unwrap(), "{name}: delete twice");
        assert_eq!(store.retrieve("k", "ns").await.unwrap(), None, "{name}");
    }
}

#[tokio::test]
async fn namespaces_and_stats() {
    let (stores, _dir) = backends().await;
    for (name, store) in stores {
        store.store("a", json!({"x": 1}), "alpha").await;
        store.store("b", json!({"y": 2}), "beta").await;

        let mut namespaces = store.list_namespaces().await.unwrap();
        namespaces.sort();
        assert_eq!(
            namespaces,
            vec!["alpha".to_string(), "beta".to_string()],
            "{name}"
        );

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.entries, 2, "{name}");
        assert!(stats.size_bytes > 0, "{name}");
        assert!(stats.last_modified.is_some(), "{name}");
    }
}

#[tokio::test]
async fn json_backend_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = JsonFileKvStore::new(dir.path(), 1024 * 1024);
        store.store("durable", json!({"v": true}), "ns").await;
    }
    let reopened = JsonFileKvStore::new(dir.path(), 1024 * 1024);
    assert_eq!(
        reopened.retrieve("durable", "ns").await.unwrap(),
        Some(json!({"v": true}))
    );
}

#[tokio::test]
async fn json_backend_rejects_oversized_writes_without_corruption() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileKvStore::new(dir.path(), 256);
    store.store("small", json!("ok"), "ns").await;

    let receipt = store
        .store("big", json!("x".repeat(4096)), "ns")
        .await;
    assert!(!receipt.is_success());

    // The namespace still holds the prior value, never a partial write.
    assert_eq!(
        store.retrieve("small", "ns").await.unwrap(),
        Some(json!("ok"))
    );
    assert_eq!(store.retrieve("big", "ns").await.unwrap(), None);
}

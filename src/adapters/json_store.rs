//! Filesystem JSON KV backend.
//!
//! One JSON file per namespace under a root directory. Every write rewrites
//! the whole namespace file through a temp file followed by a rename, so
//! readers never observe partial writes. A per-file size cap bounds the
//! whole-file rewrite cost.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::warn;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{key_matches, KvStats, KvStore, StoreReceipt};

/// JSON-file KV store rooted at a directory.
pub struct JsonFileKvStore {
    root: PathBuf,
    /// Size cap per namespace file, in bytes.
    max_file_bytes: u64,
    /// Serializes whole-file rewrites.
    write_lock: Mutex<()>,
}

impl JsonFileKvStore {
    pub fn new(root: impl Into<PathBuf>, max_file_bytes: u64) -> Self {
        Self {
            root: root.into(),
            max_file_bytes,
            write_lock: Mutex::new(()),
        }
    }

    fn namespace_path(&self, namespace: &str) -> PathBuf {
        // Namespace names become file names; path separators are not allowed.
        let safe: String = namespace
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.root.join(format!("{safe}.json"))
    }

    async fn read_namespace(&self, path: &Path) -> DomainResult<HashMap<String, Value>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| DomainError::Backend(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(DomainError::Backend(e.to_string())),
        }
    }

    async fn write_namespace(
        &self,
        path: &Path,
        entries: &HashMap<String, Value>,
    ) -> DomainResult<()> {
        let bytes =
            serde_json::to_vec_pretty(entries).map_err(|e| DomainError::Backend(e.to_string()))?;
        if bytes.len() as u64 > self.max_file_bytes {
            return Err(DomainError::Backend(format!(
                "namespace file {} would exceed size cap ({} > {} bytes)",
                path.display(),
                bytes.len(),
                self.max_file_bytes
            )));
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::Backend(e.to_string()))?;
        }

        // Temp file in the same directory so the rename stays atomic.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| DomainError::Backend(e.to_string()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| DomainError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn namespace_files(&self) -> DomainResult<Vec<(String, PathBuf)>> {
        let mut out = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(DomainError::Backend(e.to_string())),
        };
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| DomainError::Backend(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    out.push((stem.to_string(), path));
                }
            }
        }
        out.sort();
        Ok(out)
    }
}

#[async_trait]
impl KvStore for JsonFileKvStore {
    async fn store(&self, key: &str, value: Value, namespace: &str) -> StoreReceipt {
        let _guard = self.write_lock.lock().await;
        let path = self.namespace_path(namespace);
        let result: DomainResult<()> = async {
            let mut entries = self.read_namespace(&path).await?;
            entries.insert(key.to_string(), value);
            self.write_namespace(&path, &entries).await
        }
        .await;

        match result {
            Ok(()) => StoreReceipt::success(),
            Err(e) => {
                warn!(namespace, key, error = %e, "JSON store write failed");
                StoreReceipt::error(e.to_string())
            }
        }
    }

    async fn retrieve(&self, key: &str, namespace: &str) -> DomainResult<Option<Value>> {
        let path = self.namespace_path(namespace);
        let entries = self.read_namespace(&path).await?;
        Ok(entries.get(key).cloned())
    }

    async fn search(&self, pattern: &str, namespace: &str) -> DomainResult<HashMap<String, Value>> {
        let path = self.namespace_path(namespace);
        let entries = self.read_namespace(&path).await?;
        Ok(entries
            .into_iter()
            .filter(|(k, _)| key_matches(pattern, k))
            .collect())
    }

    async fn delete(&self, key: &str, namespace: &str) -> DomainResult<bool> {
        let _guard = self.write_lock.lock().await;
        let path = self.namespace_path(namespace);
        let mut entries = self.read_namespace(&path).await?;
        let existed = entries.remove(key).is_some();
        if existed {
            self.write_namespace(&path, &entries).await?;
        }
        Ok(existed)
    }

    async fn list_namespaces(&self) -> DomainResult<Vec<String>> {
        let mut namespaces = Vec::new();
        for (name, path) in self.namespace_files().await? {
            if !self.read_namespace(&path).await?.is_empty() {
                namespaces.push(name);
            }
        }
        Ok(namespaces)
    }

    async fn stats(&self) -> DomainResult<KvStats> {
        let mut stats = KvStats::default();
        let mut last: Option<DateTime<Utc>> = None;
        for (name, path) in self.namespace_files().await? {
            let entries = self.read_namespace(&path).await?;
            stats.entries += entries.len() as u64;
            if let Ok(meta) = tokio::fs::metadata(&path).await {
                stats.size_bytes += meta.len();
                if let Ok(modified) = meta.modified() {
                    let modified: DateTime<Utc> = modified.into();
                    last = Some(last.map_or(modified, |l: DateTime<Utc>| l.max(modified)));
                }
            }
            stats.namespaces.push(name);
        }
        stats.last_modified = last;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_in(dir: &tempfile::TempDir) -> JsonFileKvStore {
        JsonFileKvStore::new(dir.path(), 1024 * 1024)
    }

    #[tokio::test]
    async fn test_round_trip_and_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.store("k1", json!({"v": 7}), "projects").await.is_success());

        // A fresh store over the same root reads the persisted value.
        let reopened = store_in(&dir);
        assert_eq!(
            reopened.retrieve("k1", "projects").await.unwrap(),
            Some(json!({"v": 7}))
        );
    }

    #[tokio::test]
    async fn test_size_cap_surfaces_in_receipt() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileKvStore::new(dir.path(), 64);
        let big = json!({"payload": "x".repeat(256)});
        let receipt = store.store("k1", big, "default").await;
        assert!(!receipt.is_success());
        assert!(receipt.error.unwrap().contains("size cap"));

        // Failed write must not leave a partial file behind.
        assert_eq!(store.retrieve("k1", "default").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_and_namespaces() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.store("a", json!(1), "ns1").await;
        store.store("b", json!(2), "ns2").await;

        assert_eq!(
            store.list_namespaces().await.unwrap(),
            vec!["ns1".to_string(), "ns2".to_string()]
        );

        assert!(store.delete("a", "ns1").await.unwrap());
        assert!(!store.delete("a", "ns1").await.unwrap());
        assert_eq!(store.list_namespaces().await.unwrap(), vec!["ns2".to_string()]);
    }

    #[tokio::test]
    async fn test_search() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.store("doc-vision", json!(1), "documents").await;
        store.store("doc-adr", json!(2), "documents").await;
        store.store("note", json!(3), "documents").await;

        assert_eq!(store.search("doc", "documents").await.unwrap().len(), 2);
        assert_eq!(store.search("*", "documents").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_stats() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.store("a", json!({"n": 1}), "ns1").await;
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.entries, 1);
        assert!(stats.size_bytes > 0);
        assert_eq!(stats.namespaces, vec!["ns1".to_string()]);
    }
}

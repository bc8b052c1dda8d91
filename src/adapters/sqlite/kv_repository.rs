//! SQLite implementation of the KV store port.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use tracing::warn;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{KvStats, KvStore, StoreReceipt};

/// KV store over a `kv_entries` table.
#[derive(Clone)]
pub struct SqliteKvStore {
    pool: SqlitePool,
}

impl SqliteKvStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn store(&self, key: &str, value: Value, namespace: &str) -> StoreReceipt {
        let serialized = value.to_string();
        let result = sqlx::query(
            "INSERT INTO kv_entries (namespace, key, value, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(namespace, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
        )
        .bind(namespace)
        .bind(key)
        .bind(&serialized)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => StoreReceipt::success(),
            Err(e) => {
                warn!(namespace, key, error = %e, "SQLite store failed");
                StoreReceipt::error(e.to_string())
            }
        }
    }

    async fn retrieve(&self, key: &str, namespace: &str) -> DomainResult<Option<Value>> {
        let row = sqlx::query("SELECT value FROM kv_entries WHERE namespace = ? AND key = ?")
            .bind(namespace)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| {
            let raw: String = r.get("value");
            serde_json::from_str(&raw).map_err(|e| DomainError::Serialization(e.to_string()))
        })
        .transpose()
    }

    async fn search(&self, pattern: &str, namespace: &str) -> DomainResult<HashMap<String, Value>> {
        let rows = if pattern == "*" {
            sqlx::query("SELECT key, value FROM kv_entries WHERE namespace = ?")
                .bind(namespace)
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query(
                "SELECT key, value FROM kv_entries
                 WHERE namespace = ? AND key LIKE ? ESCAPE '\\'",
            )
            .bind(namespace)
            .bind(format!("%{}%", escape_like(pattern)))
            .fetch_all(&self.pool)
            .await?
        };

        let mut out = HashMap::with_capacity(rows.len());
        for row in rows {
            let key: String = row.get("key");
            let raw: String = row.get("value");
            let value =
                serde_json::from_str(&raw).map_err(|e| DomainError::Serialization(e.to_string()))?;
            out.insert(key, value);
        }
        Ok(out)
    }

    async fn delete(&self, key: &str, namespace: &str) -> DomainResult<bool> {
        let result = sqlx::query("DELETE FROM kv_entries WHERE namespace = ? AND key = ?")
            .bind(namespace)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_namespaces(&self) -> DomainResult<Vec<String>> {
        let rows =
            sqlx::query("SELECT DISTINCT namespace FROM kv_entries ORDER BY namespace")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.iter().map(|r| r.get("namespace")).collect())
    }

    async fn stats(&self) -> DomainResult<KvStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS entries,
                    COALESCE(SUM(LENGTH(value)), 0) AS size_bytes,
                    MAX(updated_at) AS last_modified
             FROM kv_entries",
        )
        .fetch_one(&self.pool)
        .await?;

        let entries: i64 = row.get("entries");
        let size_bytes: i64 = row.get("size_bytes");
        let last_modified: Option<String> = row.get("last_modified");
        let last_modified = last_modified
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(KvStats {
            entries: entries.max(0) as u64,
            size_bytes: size_bytes.max(0) as u64,
            last_modified,
            namespaces: self.list_namespaces().await?,
        })
    }
}

/// Escape LIKE metacharacters so patterns match literally.
fn escape_like(pattern: &str) -> String {
    pattern
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

//! SQLite adapter: WAL-mode connection pool and KV repository.

pub mod connection;
pub mod kv_repository;

pub use connection::{create_migrated_test_pool, create_pool, migrate, ConnectionError, PoolConfig};
pub use kv_repository::SqliteKvStore;

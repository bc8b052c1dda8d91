//! Adapters: concrete backends for the KV store port.

pub mod json_store;
pub mod memory_store;
pub mod sqlite;
pub mod vector_stub;

pub use json_store::JsonFileKvStore;
pub use memory_store::InMemoryKvStore;
pub use sqlite::SqliteKvStore;
pub use vector_stub::VectorKvStore;

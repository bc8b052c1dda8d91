//! Configuration infrastructure.
//!
//! Hierarchical configuration using figment:
//! - programmatic defaults
//! - `.chorus/config.yaml` (project config)
//! - `.chorus/local.yaml` (local overrides)
//! - `CHORUS_*` environment variables (highest priority)

mod loader;

pub use loader::{ConfigError, ConfigLoader};

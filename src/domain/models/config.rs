//! Type-safe configuration structs.
//!
//! Loaded hierarchically by `infrastructure::config::ConfigLoader`:
//! defaults, then `.chorus/config.yaml`, then `.chorus/local.yaml`, then
//! `CHORUS_*` environment variables.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub swarm: SwarmConfig,
    pub workflow: WorkflowSettings,
    pub coordinator: CoordinatorSettings,
    pub sparc: SparcSettings,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// SPARC engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SparcSettings {
    /// When set, a phase whose validators report failures fails hard
    /// instead of carrying the failures as recommendations.
    pub strict_validation: bool,
}

impl Default for SparcSettings {
    fn default() -> Self {
        Self {
            strict_validation: false,
        }
    }
}

/// Swarm coordinator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    /// Maximum number of registered agents.
    pub max_agents: usize,
    /// Per-agent budget for one coordination step, in milliseconds.
    pub coordination_budget_ms: u64,
    /// Success-rate threshold above which a coordination round counts as
    /// successful.
    pub success_threshold: f64,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            max_agents: 100,
            coordination_budget_ms: 500,
            success_threshold: 0.80,
        }
    }
}

/// Workflow engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSettings {
    /// Maximum concurrently running workflows.
    pub max_concurrent: usize,
    /// Default per-step deadline in milliseconds.
    pub step_timeout_ms: u64,
    /// Persist terminal workflows to the KV store.
    pub persist_workflows: bool,
    /// KV namespace terminal workflows are written to.
    pub persistence_namespace: String,
    /// Retry attempts recorded in workflow configuration; engines do not
    /// retry internally, callers rerun failed workflows.
    pub retry_attempts: u32,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            step_timeout_ms: 30_000,
            persist_workflows: false,
            persistence_namespace: "workflows".to_string(),
            retry_attempts: 3,
        }
    }
}

/// Task coordinator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorSettings {
    /// Description length beyond which tasks route through the structured
    /// pipeline.
    pub sparc_description_threshold: usize,
    /// Default per-task deadline in minutes.
    pub default_timeout_minutes: u64,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            sparc_description_threshold: 200,
            default_timeout_minutes: 10,
        }
    }
}

/// Storage backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// In-process map, lost on exit.
    Memory,
    /// SQLite with WAL.
    Sqlite,
    /// JSON file per namespace.
    Json,
    /// Vector-store stub.
    Vector,
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::Memory
    }
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
            Self::Json => "json",
            Self::Vector => "vector",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "sqlite" => Some(Self::Sqlite),
            "json" => Some(Self::Json),
            "vector" => Some(Self::Vector),
            _ => None,
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// SQLite database path.
    pub path: String,
    /// Root directory for the JSON backend.
    pub json_root: String,
    /// Size cap per JSON namespace file, in bytes.
    pub max_file_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: ".chorus/chorus.db".to_string(),
            json_root: ".chorus/store".to_string(),
            max_file_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level: trace, debug, info, warn, error.
    pub level: String,
    /// Format: pretty or json.
    pub format: String,
    /// Optional log file path; stderr when absent.
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.workflow.max_concurrent, 10);
        assert_eq!(config.workflow.step_timeout_ms, 30_000);
        assert_eq!(config.coordinator.sparc_description_threshold, 200);
        assert_eq!(config.coordinator.default_timeout_minutes, 10);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!(StorageBackend::parse_str("sqlite"), Some(StorageBackend::Sqlite));
        assert_eq!(StorageBackend::parse_str("JSON"), Some(StorageBackend::Json));
        assert_eq!(StorageBackend::parse_str("redis"), None);
    }

    #[test]
    fn test_partial_yaml_deserializes() {
        let config: Config = serde_yaml::from_str("workflow:\n  max_concurrent: 3\n").unwrap();
        assert_eq!(config.workflow.max_concurrent, 3);
        // Untouched sections keep their defaults
        assert_eq!(config.workflow.step_timeout_ms, 30_000);
        assert_eq!(config.swarm.max_agents, 100);
    }
}

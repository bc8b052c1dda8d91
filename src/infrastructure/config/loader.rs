//! Hierarchical configuration loader.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::{Config, StorageBackend};

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid max_agents: {0}. Must be between 1 and 10000")]
    InvalidMaxAgents(usize),

    #[error("Invalid max_concurrent: {0}. Must be at least 1")]
    InvalidMaxConcurrent(usize),

    #[error("Invalid step_timeout_ms: 0. Step deadlines must be positive")]
    InvalidStepTimeout,

    #[error("Invalid sparc_description_threshold: 0. Threshold must be positive")]
    InvalidDescriptionThreshold,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty for the sqlite backend")]
    EmptyDatabasePath,

    #[error("JSON store root cannot be empty for the json backend")]
    EmptyJsonRoot,

    #[error("Invalid success_threshold: {0}. Must be within (0, 1]")]
    InvalidSuccessThreshold(f64),
}

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. `.chorus/config.yaml`
    /// 3. `.chorus/local.yaml`
    /// 4. `CHORUS_*` environment variables (`__` section separator)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".chorus/config.yaml"))
            .merge(Yaml::file(".chorus/local.yaml"))
            .merge(Env::prefixed("CHORUS_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from one explicit file, on top of defaults.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate a configuration.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.swarm.max_agents == 0 || config.swarm.max_agents > 10_000 {
            return Err(ConfigError::InvalidMaxAgents(config.swarm.max_agents));
        }
        if !(0.0..=1.0).contains(&config.swarm.success_threshold)
            || config.swarm.success_threshold == 0.0
        {
            return Err(ConfigError::InvalidSuccessThreshold(
                config.swarm.success_threshold,
            ));
        }
        if config.workflow.max_concurrent == 0 {
            return Err(ConfigError::InvalidMaxConcurrent(
                config.workflow.max_concurrent,
            ));
        }
        if config.workflow.step_timeout_ms == 0 {
            return Err(ConfigError::InvalidStepTimeout);
        }
        if config.coordinator.sparc_description_threshold == 0 {
            return Err(ConfigError::InvalidDescriptionThreshold);
        }
        match config.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(ConfigError::InvalidLogLevel(other.to_string())),
        }
        match config.logging.format.as_str() {
            "json" | "pretty" => {}
            other => return Err(ConfigError::InvalidLogFormat(other.to_string())),
        }
        match config.storage.backend {
            StorageBackend::Sqlite if config.storage.path.trim().is_empty() => {
                return Err(ConfigError::EmptyDatabasePath);
            }
            StorageBackend::Json if config.storage.json_root.trim().is_empty() => {
                return Err(ConfigError::EmptyJsonRoot);
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(ConfigLoader::validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.workflow.max_concurrent = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxConcurrent(0))
        ));

        let mut config = Config::default();
        config.workflow.step_timeout_ms = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidStepTimeout)
        ));

        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogLevel(_))
        ));

        let mut config = Config::default();
        config.coordinator.sparc_description_threshold = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidDescriptionThreshold)
        ));
    }

    #[test]
    fn test_sqlite_requires_path() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Sqlite;
        config.storage.path = "  ".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyDatabasePath)
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "workflow:\n  max_concurrent: 4\n").unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.workflow.max_concurrent, 4);
        assert_eq!(config.workflow.step_timeout_ms, 30_000);
    }
}

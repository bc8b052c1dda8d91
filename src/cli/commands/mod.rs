//! CLI command implementations.

pub mod agent;
pub mod kv;
pub mod project;
pub mod task;
pub mod workflow;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::{InMemoryKvStore, JsonFileKvStore, SqliteKvStore, VectorKvStore};
use crate::domain::models::{Config, StorageBackend};
use crate::domain::ports::{KvStore, NullAgentRuntime};
use crate::services::event_bus::EventBus;
use crate::services::project_coordinator::ProjectCoordinator;
use crate::services::sparc::SparcEngine;
use crate::services::swarm_coordinator::SwarmCoordinator;
use crate::services::task_coordinator::TaskCoordinator;
use crate::services::template_registry::TemplateRegistry;
use crate::services::workflow_engine::WorkflowEngine;

/// Composed application services.
pub struct AppContext {
    pub config: Config,
    pub kv: Arc<dyn KvStore>,
    pub event_bus: Arc<EventBus>,
    pub swarm: Arc<SwarmCoordinator>,
    pub workflows: Arc<WorkflowEngine>,
    pub sparc: Arc<SparcEngine>,
    pub projects: Arc<ProjectCoordinator>,
    pub coordinator: Arc<TaskCoordinator>,
}

impl AppContext {
    /// Build the service graph from configuration.
    pub async fn from_config(config: Config) -> Result<Self> {
        let kv: Arc<dyn KvStore> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(InMemoryKvStore::new()),
            StorageBackend::Json => Arc::new(JsonFileKvStore::new(
                config.storage.json_root.clone(),
                config.storage.max_file_bytes,
            )),
            StorageBackend::Vector => Arc::new(VectorKvStore::default()),
            StorageBackend::Sqlite => {
                let url = format!("sqlite:{}", config.storage.path);
                let pool = crate::adapters::sqlite::create_pool(&url, None)
                    .await
                    .context("Failed to open the SQLite store")?;
                crate::adapters::sqlite::migrate(&pool)
                    .await
                    .context("Failed to run migrations")?;
                Arc::new(SqliteKvStore::new(pool))
            }
        };

        let event_bus = Arc::new(EventBus::default());
        let swarm = Arc::new(SwarmCoordinator::new(config.swarm.clone(), event_bus.clone()));
        let workflows = Arc::new(WorkflowEngine::new(
            config.workflow.clone(),
            kv.clone(),
            event_bus.clone(),
        ));
        let sparc = Arc::new(SparcEngine::new(
            config.sparc.clone(),
            Arc::new(TemplateRegistry::with_builtins()),
            kv.clone(),
            event_bus.clone(),
        ));
        let projects = Arc::new(ProjectCoordinator::new(
            sparc.clone(),
            workflows.clone(),
            swarm.clone(),
            kv.clone(),
        ));
        let coordinator = Arc::new(TaskCoordinator::new(
            config.coordinator.clone(),
            swarm.clone(),
            sparc.clone(),
            Arc::new(NullAgentRuntime),
        ));

        Ok(Self {
            config,
            kv,
            event_bus,
            swarm,
            workflows,
            sparc,
            projects,
            coordinator,
        })
    }
}

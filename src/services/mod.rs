//! Service layer: the coordination kernel's engines.

pub mod agent_registry;
pub mod builtin_handlers;
pub mod dispatcher;
pub mod event_bus;
pub mod project_coordinator;
pub mod sparc;
pub mod swarm_coordinator;
pub mod task_coordinator;
pub mod template_registry;
pub mod workflow_engine;

pub use agent_registry::{AgentFilter, AgentRegistry};
pub use dispatcher::TaskDispatcher;
pub use event_bus::{Event, EventBus, EventBusConfig, EventCategory, EventPayload, EventSeverity};
pub use project_coordinator::{PhaseTask, ProjectCoordinator, ProjectInit};
pub use sparc::{CompletionReport, CreateProject, PhaseMetrics, PhaseResult, SparcEngine};
pub use swarm_coordinator::{CoordinationReport, SwarmCoordinator, SwarmMetrics, Topology};
pub use task_coordinator::{
    CoordinatedTask, CoordinatorMetrics, Methodology, TaskCoordinator, TaskRecord,
};
pub use template_registry::{DomainTemplate, TemplateApplication, TemplateRegistry};
pub use workflow_engine::{DefaultGatePolicy, GatePolicy, WorkflowEngine, WorkflowSource};

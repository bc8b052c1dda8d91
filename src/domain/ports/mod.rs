//! Ports: async traits at the seams of the kernel.

pub mod agent_runtime;
pub mod kv_store;
pub mod step_handler;

pub use agent_runtime::{AgentRuntime, ExecutionContext, NullAgentRuntime, RuntimeOutput};
pub use kv_store::{key_matches, KvStats, KvStore, StoreReceipt, StoreStatus, DEFAULT_NAMESPACE};
pub use step_handler::{StepContext, StepHandler};

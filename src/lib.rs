//! Chorus — multi-agent coordination kernel.
//!
//! The kernel decides who does what, in what order, with what guarantees,
//! against a pool of heterogeneous worker agents:
//! - Swarm coordinator: agent registry, capability-scored dispatch,
//!   performance tracking, topology coordination
//! - Workflow engine: stepped workflows with gated approvals, timeouts,
//!   and pause/resume
//! - Task coordinator: direct-vs-pipeline routing with history and metrics
//! - SPARC phase engine: specification → pseudocode → architecture →
//!   refinement → completion, with per-phase validation gates
//!
//! Persistence goes through a single namespaced key-value port with SQLite
//! (WAL), JSON-file, vector-stub, and in-memory backends.

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::{DomainError, DomainResult};

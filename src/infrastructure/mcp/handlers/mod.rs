//! Tool handler modules.

pub mod agents;
pub mod projects;
pub mod workflows;

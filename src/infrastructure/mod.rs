//! Infrastructure: configuration, logging, and the tool surface.

pub mod config;
pub mod logging;
pub mod mcp;

pub use config::{ConfigError, ConfigLoader};

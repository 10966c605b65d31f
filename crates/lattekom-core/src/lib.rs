//! Shared plumbing for lattekom clients: tracing setup and configuration.

pub mod config;
pub mod tracing;

pub use config::{ClientConfig, ConfigError, LogSettings, ServerSettings, WireSettings};
pub use tracing::{init_tracing, TracingConfig, TracingError, TracingOutputFormat};

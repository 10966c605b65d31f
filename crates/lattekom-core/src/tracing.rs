//! Tracing setup for lattekom clients.
//!
//! The protocol crate reports through `tracing`: rejected calls at `warn`,
//! call bookkeeping at `debug`, raw frames at `trace` (when
//! `wire.trace_frames` is on). This module installs the subscriber that
//! turns those events into output, driven by [`ClientConfig`].
//!
//! ```ignore
//! use lattekom_core::{init_tracing, ClientConfig};
//!
//! let config = ClientConfig::load()?;
//! init_tracing(config.tracing_config())?;
//! ```
//!
//! [`ClientConfig`]: crate::ClientConfig

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// Failed to set global subscriber
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// Failed to parse env filter directive
    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Shape of each log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TracingOutputFormat {
    /// One human-readable line per event.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

/// What [`init_tracing`] installs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Level for the lattekom crates when no filter is given.
    pub default_level: Level,
    pub output_format: TracingOutputFormat,
    /// Add file and line to every event.
    pub include_location: bool,
    /// Explicit filter directive; wins over `RUST_LOG` and `default_level`.
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Compact,
            include_location: false,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Debug level with source locations, for `debug = true`.
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            default_level: Level::DEBUG,
            include_location: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Filter used when neither `env_filter` nor `RUST_LOG` is set.
    fn default_directive(&self) -> String {
        let level = self.default_level;
        format!("lattekom_core={level},lattekom_protocol={level}")
    }

    fn build_filter(&self) -> Result<EnvFilter, TracingError> {
        match self.env_filter {
            Some(ref filter) => Ok(EnvFilter::try_new(filter)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.default_directive()))),
        }
    }
}

/// Installs the global subscriber described by `config`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already set or if the filter
/// directive does not parse.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let filter = config.build_filter()?;
    let location = config.include_location;

    let layer = match config.output_format {
        TracingOutputFormat::Compact => fmt::layer()
            .compact()
            .with_file(location)
            .with_line_number(location)
            .boxed(),
        TracingOutputFormat::Json => fmt::layer()
            .json()
            .with_file(location)
            .with_line_number(location)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

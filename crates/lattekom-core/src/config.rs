//! Client configuration.
//!
//! Settings live in `~/.config/lattekom/config.toml` by default:
//!
//! ```toml
//! debug = false
//!
//! [server]
//! host = "kom.lysator.liu.se"
//! port = 4894
//! timeout = 30
//!
//! [wire]
//! trace_frames = true
//! max_message_size = 1048576
//!
//! [log]
//! format = "json"
//! filter = "lattekom_protocol=trace"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tracing::{TracingConfig, TracingOutputFormat};

/// Default Protocol A port.
pub const DEFAULT_PORT: u16 = 4894;

/// Default upper bound for a single buffered server message (1 MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`ClientConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The file parsed but holds an unusable value.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration for a lattekom client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Server connection settings.
    pub server: ServerSettings,

    /// Wire-level settings.
    pub wire: WireSettings,

    /// Log output settings.
    pub log: LogSettings,
}

/// Where to reach the server.
///
/// Held for the caller's transport. The lattekom crates work on any
/// `Read`/`Write` pair and never open connections themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server host name.
    pub host: String,

    /// Server port.
    pub port: u16,

    /// Connection timeout in seconds.
    pub timeout: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            timeout: 30,
        }
    }
}

/// Framing knobs shared by the call writer and reply reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireSettings {
    /// Log every outbound frame at trace level.
    pub trace_frames: bool,

    /// Largest server message the reader buffers before giving up.
    pub max_message_size: usize,
}

impl Default for WireSettings {
    fn default() -> Self {
        Self {
            trace_frames: false,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

/// How log lines are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub format: TracingOutputFormat,

    /// Filter directive, `RUST_LOG` syntax. Overrides the level picked by
    /// `debug`.
    pub filter: Option<String>,
}

impl ClientConfig {
    /// Loads configuration from the default path, falling back to defaults
    /// when no file exists.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must not be 0".into()));
        }
        if self.wire.max_message_size == 0 {
            return Err(ConfigError::Invalid(
                "wire.max_message_size must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lattekom")
            .join("config.toml")
    }

    /// Tracing setup for `debug` and the `[log]` section.
    pub fn tracing_config(&self) -> TracingConfig {
        let base = if self.debug {
            TracingConfig::cli_debug()
        } else {
            TracingConfig::default()
        };
        let config = base.with_format(self.log.format);
        match self.log.filter {
            Some(ref filter) => config.with_env_filter(filter.as_str()),
            None => config,
        }
    }
}

//! Configuration loading and typed config structures for thermofeed.
//!
//! Configuration lives in an optional YAML file (`thermofeed.yaml` by
//! default). Every field has a default, so a missing file or a partial
//! file is never an error. A handful of environment variables override
//! the file for container deployments.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::history::{DEFAULT_HISTORY_KEY, DEFAULT_WINDOW};
use crate::registry::DEFAULT_SUBSCRIBER_BUFFER;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "thermofeed.yaml";

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "THERMOFEED_CONFIG";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is present but unusable.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FeedConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ListenConfig,

    /// History store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Tick loop and fan-out settings.
    #[serde(default)]
    pub stream: StreamConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FeedConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment overrides are applied and the result validated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `THERMOFEED_CONFIG` or `thermofeed.yaml` when the file
    /// exists; otherwise start from defaults. Environment overrides apply
    /// either way.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an existing file is unreadable or
    /// invalid, or an override does not parse.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
        let path = Path::new(&path);
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from the process environment.
    ///
    /// - `PORT` overrides `server.port`
    /// - `REDIS_URL` overrides `store.url`
    /// - `HISTORY_KEY` overrides `store.history_key`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `PORT` is not a valid port.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Override fields using `lookup` in place of the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `PORT` is not a valid port.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port.trim().parse().map_err(|e| ConfigError::Invalid {
                reason: format!("PORT must be a port number, got {port:?}: {e}"),
            })?;
        }
        if let Some(url) = lookup("REDIS_URL") {
            self.store.url = url;
        }
        if let Some(key) = lookup("HISTORY_KEY") {
            self.store.history_key = key;
        }
        Ok(())
    }

    /// Reject values the service cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.window == 0 {
            return Err(ConfigError::Invalid {
                reason: "store.window must be at least 1".to_owned(),
            });
        }
        if self.store.history_key.is_empty() {
            return Err(ConfigError::Invalid {
                reason: "store.history_key must not be empty".to_owned(),
            });
        }
        if self.stream.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                reason: "stream.tick_interval_ms must be at least 1".to_owned(),
            });
        }
        if self.stream.subscriber_buffer == 0 {
            return Err(ConfigError::Invalid {
                reason: "stream.subscriber_buffer must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListenConfig {
    /// Address to bind (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Which store implementation holds the history window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackendKind {
    /// Redis-compatible server at `store.url`.
    #[default]
    Dragonfly,
    /// In-process store; history is lost on restart.
    Memory,
}

/// History store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// Store implementation.
    #[serde(default)]
    pub backend: StoreBackendKind,

    /// Redis URL of the `Dragonfly` instance.
    #[serde(default = "default_store_url")]
    pub url: String,

    /// List key holding the readings.
    #[serde(default = "default_history_key")]
    pub history_key: String,

    /// Maximum number of readings retained.
    #[serde(default = "default_window")]
    pub window: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackendKind::default(),
            url: default_store_url(),
            history_key: default_history_key(),
            window: default_window(),
        }
    }
}

/// Tick loop configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StreamConfig {
    /// Milliseconds between ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Readings buffered per subscriber before frames are dropped.
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

impl StreamConfig {
    /// Tick cadence as a [`Duration`].
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    3000
}

fn default_store_url() -> String {
    "redis://127.0.0.1:6379".to_owned()
}

fn default_history_key() -> String {
    DEFAULT_HISTORY_KEY.to_owned()
}

const fn default_window() -> usize {
    DEFAULT_WINDOW
}

const fn default_tick_interval_ms() -> u64 {
    1_000
}

const fn default_subscriber_buffer() -> usize {
    DEFAULT_SUBSCRIBER_BUFFER
}

fn default_log_level() -> String {
    "info".to_owned()
}

//! Startup configuration for the master server.

use crate::registry::DuplicatePolicy;
use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Configuration for the master server.
///
/// Loaded from an optional TOML file; command-line flags override it.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct MasterConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    #[setters(into)]
    host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    port: u16,

    /// Base URL of the external score collector. Scores are dropped when unset.
    #[serde(default)]
    #[setters(strip_option, into)]
    collector_url: Option<String>,

    /// Address prefix the advertised interface should match (e.g. "192.168.201").
    #[serde(default)]
    #[setters(strip_option, into)]
    network_prefix: Option<String>,

    /// Handling of a board ID that is registered twice.
    #[serde(default)]
    duplicate_policy: DuplicatePolicy,

    /// Seconds before a collector request is abandoned.
    #[serde(default = "default_collector_timeout_secs")]
    collector_timeout_secs: u64,

    /// Maximum number of score deliveries waiting to be sent.
    #[serde(default = "default_queue_capacity")]
    queue_capacity: usize,

    /// Seconds shutdown waits for queued scores before abandoning them.
    #[serde(default = "default_drain_timeout_secs")]
    drain_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_collector_timeout_secs() -> u64 {
    5
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_drain_timeout_secs() -> u64 {
    10
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            collector_url: None,
            network_prefix: None,
            duplicate_policy: DuplicatePolicy::default(),
            collector_timeout_secs: default_collector_timeout_secs(),
            queue_capacity: default_queue_capacity(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

impl MasterConfig {
    /// Loads configuration from a TOML file. Missing keys take their defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(port = config.port, "Config loaded successfully");
        Ok(config)
    }

    /// Collector request timeout.
    pub fn collector_timeout(&self) -> Duration {
        Duration::from_secs(self.collector_timeout_secs)
    }

    /// Upper bound on the shutdown drain.
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }

    /// Checks values that serde cannot.
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::new("queue_capacity must be at least 1"));
        }
        if self.collector_timeout_secs == 0 {
            return Err(ConfigError::new("collector_timeout_secs must be at least 1"));
        }
        if let Some(url) = &self.collector_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::new(format!(
                    "collector_url '{}' must start with http:// or https://",
                    url
                )));
            }
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

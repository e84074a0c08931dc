use crate::Result;
use crate::coordinator::RestartPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub restart: RestartConfig,

    #[serde(default)]
    pub service: ServiceConfig,

    /// Package identifier of the host application, never listed
    #[serde(default)]
    pub host_package: Option<String>,
}

impl Config {
    /// Load config from file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        super::warn_unknown_keys(&content, "config.json", super::KnownKeys::Config);
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save config to file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    #[must_use]
    pub fn search_interval(&self) -> Duration {
        Duration::from_millis(self.search.debounce_ms)
    }

    #[must_use]
    pub fn restart_policy(&self) -> RestartPolicy {
        RestartPolicy {
            poll_interval: Duration::from_millis(self.restart.poll_interval_ms),
            max_polls: self.restart.max_polls,
            call_timeout: Duration::from_millis(self.restart.command_timeout_ms),
        }
    }
}

/// Search view configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
    /// Pause between two filter passes; bounds how often the list is refiltered
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,
}

fn default_debounce() -> u64 {
    200
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce(),
        }
    }
}

/// Tunnel restart behaviour at session teardown
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestartConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_max_polls")]
    pub max_polls: u32,

    /// Upper bound for any single status/start/stop call
    #[serde(default = "default_command_timeout")]
    pub command_timeout_ms: u64,
}

fn default_poll_interval() -> u64 {
    200
}
fn default_max_polls() -> u32 {
    50
}
fn default_command_timeout() -> u64 {
    5000
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            max_polls: default_max_polls(),
            command_timeout_ms: default_command_timeout(),
        }
    }
}

/// Commands used to drive the tunnel service. Each is an argv array;
/// the status command exits 0 while the tunnel is running.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    #[serde(default)]
    pub status_command: Option<Vec<String>>,

    #[serde(default)]
    pub start_command: Option<Vec<String>>,

    #[serde(default)]
    pub stop_command: Option<Vec<String>>,
}

impl ServiceConfig {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.status_command.is_some() && self.start_command.is_some() && self.stop_command.is_some()
    }
}

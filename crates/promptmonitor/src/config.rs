//! Configuration management for promptmonitor.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "promptmonitor";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "state.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `PROMPTMONITOR_`, sections
///    separated by `__`, e.g. `PROMPTMONITOR_RELAY__SYNC_INTERVAL_SECS`)
/// 2. TOML config file at `~/.config/promptmonitor/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Interception configuration.
    pub interception: InterceptionConfig,
    /// Relay configuration.
    pub relay: RelayConfig,
    /// Coordinator configuration.
    pub coordinator: CoordinatorConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the state database.
    /// Defaults to `~/.local/share/promptmonitor/state.db`
    pub database_path: Option<PathBuf>,
}

/// Which outbound requests are inspected and how detections are recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterceptionConfig {
    /// URL path suffixes of protected endpoints. Matched exactly, not as regex.
    pub endpoints: Vec<String>,
    /// Number of prompt characters kept as context for each detection.
    pub preview_length: usize,
}

/// Relay-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Seconds between suppression list pulls.
    pub sync_interval_secs: u64,
}

/// Coordinator-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Number of commands that may queue before senders wait.
    pub mailbox_capacity: usize,
    /// Number of state snapshots buffered per observer.
    pub observer_capacity: usize,
}

impl Default for InterceptionConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            preview_length: 100,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            sync_interval_secs: 60,
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 64,
            observer_capacity: 16,
        }
    }
}

/// Default protected endpoint suffixes.
fn default_endpoints() -> Vec<String> {
    vec![
        "/backend-api/conversation".to_string(),
        "/backend-api/f/conversation".to_string(),
    ]
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `PROMPTMONITOR_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("PROMPTMONITOR_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.interception.endpoints.is_empty() {
            return Err(Error::ConfigValidation {
                message: "interception.endpoints must not be empty".to_string(),
            });
        }

        for endpoint in &self.interception.endpoints {
            if !endpoint.starts_with('/') {
                return Err(Error::ConfigValidation {
                    message: format!("endpoint suffix must start with '/': {endpoint}"),
                });
            }
        }

        if self.interception.preview_length == 0 {
            return Err(Error::ConfigValidation {
                message: "preview_length must be greater than 0".to_string(),
            });
        }

        if self.relay.sync_interval_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "sync_interval_secs must be greater than 0".to_string(),
            });
        }

        if self.coordinator.mailbox_capacity == 0 || self.coordinator.observer_capacity == 0 {
            return Err(Error::ConfigValidation {
                message: "coordinator capacities must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the suppression sync interval as a Duration.
    #[must_use]
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.relay.sync_interval_secs)
    }
}

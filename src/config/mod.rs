//! Store and controller settings, loadable from a TOML file.
//!
//! Every field has a default, so an empty file (or no file at all) yields
//! the stock behavior.
//!
//! # Examples
//!
//! ```
//! use uistore::config::Config;
//!
//! let config = Config::from_toml_str("[autosave]\ndelay_ms = 500\n").unwrap();
//! assert_eq!(config.autosave.delay_ms, 500);
//! assert_eq!(config.notification.default_duration_ms, 5_000);
//! ```

pub mod defaults;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub use defaults::{DEFAULT_AUTOSAVE_DELAY_MS, DEFAULT_NOTIFICATION_DURATION_MS};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub notification: NotificationConfig,
    #[serde(default)]
    pub autosave: AutoSaveConfig,
}

/// Settings for [`NotificationStore`](crate::NotificationStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Auto-dismiss delay used by `show`. Zero or negative keeps
    /// notifications until they are dismissed by hand.
    #[serde(default = "default_notification_duration_ms")]
    pub default_duration_ms: i64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            default_duration_ms: DEFAULT_NOTIFICATION_DURATION_MS,
        }
    }
}

/// Settings for [`AutoSaveController`](crate::AutoSaveController).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoSaveConfig {
    #[serde(default = "default_autosave_delay_ms")]
    pub delay_ms: u64,
}

impl AutoSaveConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_AUTOSAVE_DELAY_MS,
        }
    }
}

fn default_notification_duration_ms() -> i64 {
    DEFAULT_NOTIFICATION_DURATION_MS
}

fn default_autosave_delay_ms() -> u64 {
    DEFAULT_AUTOSAVE_DELAY_MS
}

impl Config {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Load a configuration file.
///
/// A missing file is not an error and yields [`Config::default`]. A file
/// that exists but fails to parse is reported as [`Error::Config`](crate::Error::Config).
pub fn load_from_path(path: &Path) -> Result<Config> {
    if !path.exists() {
        log::debug!("no config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let content = fs::read_to_string(path)?;
    Config::from_toml_str(&content)
}

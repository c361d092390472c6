//! YAML configuration.
//!
//! Every field has a default, so an empty document (or no file at all) yields a
//! working configuration for a panel on `/dev/ttyS1`.
//!
//! ```rust
//! use ezio::config::Config;
//!
//! let config = Config::from_yaml("status:\n  rotate_interval_ms: 15000\n").unwrap();
//! assert_eq!(config.status.rotate_interval().as_secs(), 15);
//! assert_eq!(config.status.render_interval().as_millis(), 500);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::link::LinkOptions;
use crate::menu::ActionFailurePolicy;
use crate::{LcdError, Result};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub link: LinkConfig,
    pub status: StatusConfig,
    pub buttons: ButtonConfig,
    pub menu: MenuConfig,
    /// Interface name to operator description, e.g. `igb0: WAN`.
    pub interfaces: BTreeMap<String, String>,
}

impl Config {
    /// Read and parse a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LcdError::config_error(path, format!("cannot read file: {}", e)))?;
        let config = serde_yaml_ng::from_str(&content)
            .map_err(|e| LcdError::config_error(path, e.to_string()))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml_ng::from_str(yaml)
            .map_err(|e| LcdError::config_error("<inline>", e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml_ng::to_string(self)
            .map_err(|e| LcdError::config_error("<inline>", e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub port: PathBuf,
    pub command_delay_ms: u64,
    /// Log hex previews of every payload at trace level.
    pub dump_payloads: bool,
}

impl LinkConfig {
    pub fn command_delay(&self) -> Duration {
        Duration::from_millis(self.command_delay_ms)
    }

    pub fn options(&self) -> LinkOptions {
        LinkOptions {
            command_delay: self.command_delay(),
            dump_payloads: self.dump_payloads,
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: PathBuf::from("/dev/ttyS1"),
            command_delay_ms: 1,
            dump_payloads: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub refresh_interval_ms: u64,
    pub render_interval_ms: u64,
    pub rotate_interval_ms: u64,
    /// Longest a single metrics collection may take; 0 waits forever.
    pub metrics_timeout_ms: u64,
    /// Samples kept for CPU and traffic history.
    pub history_len: usize,
    pub thresholds: HealthThresholds,
}

impl StatusConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms.max(1))
    }

    pub fn rotate_interval(&self) -> Duration {
        Duration::from_millis(self.rotate_interval_ms.max(1))
    }

    pub fn metrics_timeout(&self) -> Option<Duration> {
        (self.metrics_timeout_ms > 0).then(|| Duration::from_millis(self.metrics_timeout_ms))
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 5000,
            render_interval_ms: 500,
            rotate_interval_ms: 10_000,
            metrics_timeout_ms: 10_000,
            history_len: 12,
            thresholds: HealthThresholds::default(),
        }
    }
}

/// CPU and memory percentages above which the health LED turns orange
/// (`*_warn`) or red (`*_crit`). Comparisons are strict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthThresholds {
    pub cpu_warn: f64,
    pub cpu_crit: f64,
    pub mem_warn: f64,
    pub mem_crit: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            cpu_warn: 70.0,
            cpu_crit: 90.0,
            mem_warn: 80.0,
            mem_crit: 90.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonConfig {
    pub poll_interval_ms: u64,
    pub queue_capacity: usize,
}

impl ButtonConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            queue_capacity: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    pub visible_rows: usize,
    pub failure_policy: ActionFailurePolicy,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            visible_rows: 6,
            failure_policy: ActionFailurePolicy::SkipRender,
        }
    }
}

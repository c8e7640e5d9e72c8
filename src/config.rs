use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::RunMode;

pub const DEFAULT_LATENCY_THRESHOLD_MS: u64 = 500;
pub const DEFAULT_ERROR_ALERT_THRESHOLD: u64 = 2;
pub const DEFAULT_BATCH_REPEAT: u32 = 3;
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Contents of the YAML config file.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct MonitorConfig {
    #[serde(default)]
    pub slack_url: Option<String>,
    #[serde(default)]
    pub slack_msg: Option<String>,
    /// Carried for compatibility with existing config files; unused.
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub servers: Vec<String>,
}

impl MonitorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn notification(&self) -> NotificationSettings {
        NotificationSettings {
            webhook_url: self.slack_url.clone(),
            suffix: self.slack_msg.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationSettings {
    pub webhook_url: Option<String>,
    pub suffix: String,
}

impl NotificationSettings {
    /// The webhook target, if one is configured. Blank values count as unset.
    pub fn webhook_url(&self) -> Option<&str> {
        self.webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url().is_some()
    }
}

/// Cadence of the monitoring loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Batches per cycle.
    pub batch_repeat: u32,
    /// Pause between consecutive batches of a cycle.
    pub batch_pause: Duration,
    /// Pause after each cycle in continuous mode.
    pub cycle_interval: Duration,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            batch_repeat: DEFAULT_BATCH_REPEAT,
            batch_pause: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            cycle_interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    pub mode: RunMode,
    pub latency_threshold_ms: u64,
    pub error_alert_threshold: u64,
    pub schedule: Schedule,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            mode: RunMode::Continuous,
            latency_threshold_ms: DEFAULT_LATENCY_THRESHOLD_MS,
            error_alert_threshold: DEFAULT_ERROR_ALERT_THRESHOLD,
            schedule: Schedule::default(),
        }
    }
}

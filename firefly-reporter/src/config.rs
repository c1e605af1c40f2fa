use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::adapter::AccessPoint;
use crate::reporter::ReporterOptions;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub relay: RelayEndpoint,
    pub network: AccessPoint,
    pub reporter: ReporterConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayEndpoint {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    pub device_label: String,
    pub hold_interval_ms: u64,
    pub settle_interval_ms: u64,
    pub retry_backoff_ms: u64,
    pub request_timeout_ms: u64,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

impl Default for RelayEndpoint {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8000".to_string(),
        }
    }
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            device_label: "firefly".to_string(),
            hold_interval_ms: 2_000,
            settle_interval_ms: 5_000,
            retry_backoff_ms: 10_000,
            request_timeout_ms: 5_000,
        }
    }
}

impl ReporterConfig {
    pub fn reporter_options(&self) -> ReporterOptions {
        ReporterOptions {
            device_label: self.device_label.clone().into(),
            hold_interval: Duration::from_millis(self.hold_interval_ms),
            settle_interval: Duration::from_millis(self.settle_interval_ms),
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

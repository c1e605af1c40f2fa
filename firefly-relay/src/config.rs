use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::broadcast::BroadcastOptions;
use crate::mailbox;

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
    pub server: ServerConfig,
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub http_addr: SocketAddr,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Pending-record cap; beyond it the oldest record is dropped.
    pub queue_capacity: usize,
    pub poll_interval_ms: u64,
    pub delivery_timeout_ms: u64,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            queue_capacity: mailbox::DEFAULT_CAPACITY,
            poll_interval_ms: 100,
            delivery_timeout_ms: 100,
        }
    }
}

impl RelayConfig {
    pub fn broadcast_options(&self) -> BroadcastOptions {
        BroadcastOptions {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            delivery_timeout: Duration::from_millis(self.delivery_timeout_ms),
        }
    }
}

//! Gateway configuration
//!
//! Every policy constant of the bridge (timeouts, reconnect cadence, buffer
//! size, pool size) lives here rather than in the code that uses it. All
//! fields have defaults, so an empty file is a valid configuration.
//!
//! ```toml
//! [driver]
//! host = "driver"
//! port = 6001
//! reconnect_interval_ms = 1000
//!
//! [gateway]
//! reply_timeout_ms = 15000
//!
//! [server]
//! port = 7001
//! workers = 4
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::framing::Framing;

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Backend (driver) connection
    #[serde(default)]
    pub driver: DriverConfig,
    /// Request gateway policy
    #[serde(default)]
    pub gateway: GatewaySection,
    /// HTTP front end
    #[serde(default)]
    pub server: ServerConfig,
}

impl GatewayConfig {
    /// Load and validate configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Reject values that would make the bridge spin or never answer
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.driver;
        if d.host.trim().is_empty() {
            return Err(ConfigError::Invalid("driver.host must not be empty".into()));
        }
        for (name, value) in [
            ("driver.connect_timeout_ms", d.connect_timeout_ms),
            ("driver.read_timeout_ms", d.read_timeout_ms),
            ("driver.write_timeout_ms", d.write_timeout_ms),
            ("driver.reconnect_interval_ms", d.reconnect_interval_ms),
            ("gateway.reply_timeout_ms", self.gateway.reply_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be greater than 0", name)));
            }
        }
        if d.read_buffer_size == 0 {
            return Err(ConfigError::Invalid(
                "driver.read_buffer_size must be greater than 0".into(),
            ));
        }
        if self.server.workers == 0 {
            return Err(ConfigError::Invalid(
                "server.workers must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Driver connection and relay loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Driver host name or IP address
    #[serde(default = "default_driver_host")]
    pub host: String,
    /// Driver TCP port
    #[serde(default = "default_driver_port")]
    pub port: u16,
    /// Upper bound for a single connect attempt
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Upper bound for a single read attempt; also bounds how long queued
    /// commands wait before being flushed
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
    /// Upper bound for writing and flushing one command; a driver that
    /// stops reading is treated as a dead connection after this long
    #[serde(default = "default_write_timeout")]
    pub write_timeout_ms: u64,
    /// Fixed pause between failed connect attempts
    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval_ms: u64,
    /// Bytes requested per read
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
    /// Message framing on the wire
    #[serde(default)]
    pub framing: Framing,
}

fn default_driver_host() -> String {
    "driver".to_string()
}

fn default_driver_port() -> u16 {
    6001
}

fn default_connect_timeout() -> u64 {
    1000
}

fn default_read_timeout() -> u64 {
    100
}

fn default_write_timeout() -> u64 {
    1000
}

fn default_reconnect_interval() -> u64 {
    1000
}

fn default_read_buffer_size() -> usize {
    1024
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            host: default_driver_host(),
            port: default_driver_port(),
            connect_timeout_ms: default_connect_timeout(),
            read_timeout_ms: default_read_timeout(),
            write_timeout_ms: default_write_timeout(),
            reconnect_interval_ms: default_reconnect_interval(),
            read_buffer_size: default_read_buffer_size(),
            framing: Framing::default(),
        }
    }
}

impl DriverConfig {
    /// `host:port` of the driver
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }
}

/// Request gateway settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewaySection {
    /// How long a caller waits for its reply
    #[serde(default = "default_reply_timeout")]
    pub reply_timeout_ms: u64,
}

fn default_reply_timeout() -> u64 {
    15_000
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            reply_timeout_ms: default_reply_timeout(),
        }
    }
}

impl GatewaySection {
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }
}

/// HTTP front end settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_server_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Request worker pool size (runtime threads and in-flight request limit)
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    7001
}

fn default_workers() -> usize {
    4
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            workers: default_workers(),
        }
    }
}

impl ServerConfig {
    /// `host:port` to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

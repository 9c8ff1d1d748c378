//! Gateway API types

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Outcome of one command sent through the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Command as sent
    pub command: String,
    /// HTTP status (200, 400 or 408)
    pub status: u16,
    /// Driver reply, or `timeout` when the gateway gave up
    pub body: String,
    /// Round-trip time observed by the client
    pub elapsed: Duration,
}

impl CommandResult {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Driver rejected the command
    pub fn is_validation_error(&self) -> bool {
        self.status == 400
    }

    /// Driver or gateway timed out
    pub fn is_timeout(&self) -> bool {
        self.status == 408
    }
}

/// Gateway status as reported by `GET /_status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayStatus {
    /// `connected`, `connecting` or `disconnected`
    pub connection: String,
    pub relay_running: bool,
    /// Driver endpoint
    pub driver: String,
}

impl GatewayStatus {
    pub fn is_connected(&self) -> bool {
        self.connection == "connected"
    }
}

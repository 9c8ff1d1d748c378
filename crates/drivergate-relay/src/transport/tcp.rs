//! TCP connector

use std::io::ErrorKind;
use std::time::Duration;

use async_trait::async_trait;
use drivergate_core::DriverConfig;
use tokio::net::TcpStream;
use tracing::debug;

use super::{BoxedStream, Connector, TransportError};

/// Connects to the driver over TCP with a bounded connect timeout
#[derive(Debug, Clone)]
pub struct TcpConnector {
    address: String,
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(address: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            connect_timeout,
        }
    }

    pub fn from_config(config: &DriverConfig) -> Self {
        Self::new(config.address(), config.connect_timeout())
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> Result<BoxedStream, TransportError> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.address))
            .await
            .map_err(|_| {
                TransportError::Timeout(format!(
                    "connect to {} after {:?}",
                    self.address, self.connect_timeout
                ))
            })?
            .map_err(|e| match e.kind() {
                ErrorKind::ConnectionRefused => TransportError::ConnectionRefused(self.address.clone()),
                _ => TransportError::ConnectionFailed(format!("{}: {}", self.address, e)),
            })?;

        // Commands are small and latency bound
        if let Err(e) = stream.set_nodelay(true) {
            debug!(%e, "Failed to set TCP_NODELAY");
        }

        Ok(Box::new(stream))
    }

    fn endpoint(&self) -> String {
        self.address.clone()
    }
}

//! Connection manager for the driver session
//!
//! Owns the one outbound connection. Connecting is retried forever at a
//! fixed interval until it succeeds or the stop signal is raised; there is
//! no attempt ceiling and no backoff.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::transport::{BoxedStream, Connector};

/// Lifecycle state of the driver connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Manages connect / fault / reconnect / close of the driver stream
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    reconnect_interval: Duration,
    /// Published copy of the state; written only from here
    state: Arc<RwLock<ConnectionState>>,
    stream: Option<BoxedStream>,
    failed_attempts: u64,
}

impl ConnectionManager {
    pub fn new(
        connector: Arc<dyn Connector>,
        reconnect_interval: Duration,
        state: Arc<RwLock<ConnectionState>>,
    ) -> Self {
        *state.write() = ConnectionState::Disconnected;
        Self {
            connector,
            reconnect_interval,
            state,
            stream: None,
            failed_attempts: 0,
        }
    }

    /// Get the current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// The active stream, if connected
    pub fn stream_mut(&mut self) -> Option<&mut BoxedStream> {
        self.stream.as_mut()
    }

    /// Connect if not already connected, retrying until success
    ///
    /// Returns `false` if the stop signal was raised before a connection was
    /// established.
    pub async fn ensure_connected(&mut self, stop: &mut watch::Receiver<bool>) -> bool {
        while self.stream.is_none() {
            if *stop.borrow() {
                return false;
            }

            self.set_state(ConnectionState::Connecting);
            match self.connector.connect().await {
                Ok(stream) => {
                    info!(
                        endpoint = %self.connector.endpoint(),
                        failed_attempts = self.failed_attempts,
                        "Connected to driver"
                    );
                    self.stream = Some(stream);
                    self.failed_attempts = 0;
                    self.set_state(ConnectionState::Connected);
                }
                Err(e) => {
                    self.failed_attempts += 1;
                    self.set_state(ConnectionState::Disconnected);
                    warn!(
                        endpoint = %self.connector.endpoint(),
                        attempt = self.failed_attempts,
                        retry_in_ms = self.reconnect_interval.as_millis() as u64,
                        %e,
                        "Connection refused or timed out"
                    );

                    tokio::select! {
                        _ = tokio::time::sleep(self.reconnect_interval) => {}
                        changed = stop.changed() => {
                            // Sender gone means nobody can stop us any more: treat as stop
                            if changed.is_err() {
                                return false;
                            }
                        }
                    }
                }
            }
        }
        true
    }

    /// Drop the connection after an I/O fault
    pub fn disconnect(&mut self) {
        if self.stream.take().is_some() {
            debug!(endpoint = %self.connector.endpoint(), "Driver connection dropped");
        }
        self.set_state(ConnectionState::Disconnected);
    }

    /// Close the connection cleanly
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!(%e, "Shutdown of driver connection failed");
            }
            info!(endpoint = %self.connector.endpoint(), "Driver connection closed");
        }
        self.set_state(ConnectionState::Disconnected);
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
    }
}

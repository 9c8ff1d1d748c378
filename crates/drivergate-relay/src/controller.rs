//! Controller lifecycle
//!
//! The controller owns the correlation queues for its whole lifetime and
//! runs the [`MessageRelay`] as a spawned task between `start()` and
//! `stop()`. Callers only ever see [`Controller::handle`].

use std::sync::Arc;
use std::time::Instant;

use drivergate_core::{DriverConfig, GatewayConfig, GatewayReply};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::channels::{correlation_channels, RelayEndpoints};
use crate::connection::{ConnectionManager, ConnectionState};
use crate::gateway::CommandGateway;
use crate::relay::MessageRelay;
use crate::transport::{Connector, TcpConnector};

/// Snapshot of the controller for status reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerStatus {
    pub connection: ConnectionState,
    pub relay_running: bool,
    pub driver: String,
}

enum RelaySlot {
    /// Not running; holds the relay ends of the queues
    Idle(RelayEndpoints),
    Running {
        stop_tx: watch::Sender<bool>,
        task: JoinHandle<RelayEndpoints>,
    },
    /// The relay task panicked and took the queue ends with it
    Lost,
}

/// Ties the queues, the relay task and the request gateway together
pub struct Controller {
    driver: DriverConfig,
    connector: Arc<dyn Connector>,
    gateway: CommandGateway,
    connection_state: Arc<RwLock<ConnectionState>>,
    relay: Mutex<RelaySlot>,
}

impl Controller {
    /// Create a controller using the given connector
    pub fn new(connector: Arc<dyn Connector>, config: &GatewayConfig) -> Self {
        let (gateway_side, relay_side) = correlation_channels();
        Self {
            driver: config.driver.clone(),
            connector,
            gateway: CommandGateway::new(gateway_side, config.gateway.reply_timeout())
                .with_framing(config.driver.framing),
            connection_state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            relay: Mutex::new(RelaySlot::Idle(relay_side)),
        }
    }

    /// Create a controller that connects to the configured driver over TCP
    pub fn from_config(config: &GatewayConfig) -> Self {
        let connector = Arc::new(TcpConnector::from_config(&config.driver));
        Self::new(connector, config)
    }

    /// Launch the relay
    ///
    /// Starting a running controller is a no-op.
    pub async fn start(&self) -> Result<(), ControllerError> {
        let mut slot = self.relay.lock().await;
        match std::mem::replace(&mut *slot, RelaySlot::Lost) {
            RelaySlot::Idle(endpoints) => {
                let connection = ConnectionManager::new(
                    self.connector.clone(),
                    self.driver.reconnect_interval(),
                    self.connection_state.clone(),
                );
                let relay = MessageRelay::new(connection, endpoints, &self.driver);
                let (stop_tx, stop_rx) = watch::channel(false);
                let task = tokio::spawn(relay.run(stop_rx));
                *slot = RelaySlot::Running { stop_tx, task };
                info!(driver = %self.connector.endpoint(), "Controller started");
                Ok(())
            }
            running @ RelaySlot::Running { .. } => {
                *slot = running;
                warn!("Controller already running");
                Ok(())
            }
            RelaySlot::Lost => Err(ControllerError::RelayLost),
        }
    }

    /// Signal the relay to stop, close the connection and wait for the
    /// relay task to exit
    ///
    /// Stopping a controller that is not running is a no-op.
    pub async fn stop(&self) {
        let mut slot = self.relay.lock().await;
        match std::mem::replace(&mut *slot, RelaySlot::Lost) {
            RelaySlot::Running { stop_tx, task } => {
                info!("Controller stopping");
                let _ = stop_tx.send(true);
                match task.await {
                    Ok(endpoints) => {
                        *slot = RelaySlot::Idle(endpoints);
                        info!("Controller stopped");
                    }
                    Err(e) => error!(%e, "Relay task failed"),
                }
            }
            other => *slot = other,
        }
    }

    /// Relay one command to the driver and classify its reply
    pub async fn handle(&self, command: &str) -> GatewayReply {
        let started = Instant::now();
        let reply = self.gateway.handle(command).await;
        info!(
            %command,
            status = reply.status_code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Command handled"
        );
        reply
    }

    pub async fn is_running(&self) -> bool {
        matches!(*self.relay.lock().await, RelaySlot::Running { .. })
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.connection_state.read()
    }

    pub async fn status(&self) -> ControllerStatus {
        ControllerStatus {
            connection: self.connection_state(),
            relay_running: self.is_running().await,
            driver: self.connector.endpoint(),
        }
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        if let RelaySlot::Running { stop_tx, .. } = self.relay.get_mut() {
            let _ = stop_tx.send(true);
        }
    }
}

/// Controller lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("Relay task was lost; the controller cannot be restarted")]
    RelayLost,
}

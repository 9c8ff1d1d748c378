//! drivergate-relay - Queue-mediated bridge to the driver
//!
//! This crate owns the single long-lived byte-stream session to the driver
//! and lets any number of callers use it one command at a time.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Controller                            │
//! │                   start() / stop() / handle()                 │
//! │                                                              │
//! │  ┌────────────────┐   commands-out   ┌────────────────────┐  │
//! │  │ CommandGateway │ ───────────────► │   MessageRelay     │  │
//! │  │ (one in-flight │                  │  (spawned task)    │  │
//! │  │  command lock) │ ◄─────────────── │                    │  │
//! │  └────────────────┘    replies-in    │ ┌────────────────┐ │  │
//! │                                      │ │ConnectionManager│ │  │
//! │                                      │ └───────┬────────┘ │  │
//! │                                      └─────────┼──────────┘  │
//! │                                        ┌───────┴────────┐    │
//! │                                        │   Connector    │    │
//! │                                        │  (TCP / mock)  │    │
//! │                                        └────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use drivergate_core::GatewayConfig;
//! use drivergate_relay::Controller;
//!
//! let controller = Controller::from_config(&GatewayConfig::default());
//! controller.start().await?;
//! let (body, status) = controller.handle("ping").await.into_parts();
//! controller.stop().await;
//! ```

pub mod channels;
pub mod connection;
pub mod controller;
pub mod gateway;
pub mod relay;
pub mod transport;

pub use channels::{correlation_channels, GatewayEndpoints, RelayEndpoints};
pub use connection::{ConnectionManager, ConnectionState};
pub use controller::{Controller, ControllerError, ControllerStatus};
pub use gateway::CommandGateway;
pub use relay::MessageRelay;
pub use transport::{BoxedStream, Connector, DriverStream, TcpConnector, TransportError};

// Re-export for convenience
pub use drivergate_core::{DriverConfig, Framing, GatewayConfig, GatewayReply};

//! Transport layer for the driver connection
//!
//! This module provides connectors that open the byte stream to the driver:
//! - TCP connector for the real driver
//! - Mock connector (in-memory duplex pipes) for testing
//!
//! # Example
//!
//! ```ignore
//! use drivergate_relay::transport::{Connector, TcpConnector};
//!
//! let connector = TcpConnector::new("driver:6001", Duration::from_secs(1));
//! let stream = connector.connect().await?;
//! ```

pub mod error;
pub mod mock;
mod tcp;

pub use error::TransportError;
pub use tcp::TcpConnector;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// A bidirectional byte stream to the driver
pub trait DriverStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> DriverStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// Type-erased driver stream as handed out by a [`Connector`]
pub type BoxedStream = Box<dyn DriverStream>;

/// Opens connections to the driver
///
/// Implementations bound every attempt themselves; the caller decides
/// whether and when to retry.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Make one connection attempt
    async fn connect(&self) -> Result<BoxedStream, TransportError>;

    /// Description of the remote end, for logs and status
    fn endpoint(&self) -> String;
}

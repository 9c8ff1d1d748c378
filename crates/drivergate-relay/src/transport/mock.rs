//! Mock connector for testing
//!
//! Every successful `connect()` creates an in-memory duplex pipe. The
//! gateway keeps one end; the other end is handed to the test through
//! [`MockDriverListener`], so the test plays the driver.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::DuplexStream;
use tokio::sync::mpsc;

use super::{BoxedStream, Connector, TransportError};

const PIPE_CAPACITY: usize = 64 * 1024;

/// Mock connector for testing
pub struct MockConnector {
    refusing: AtomicBool,
    attempts: AtomicUsize,
    accepted_tx: mpsc::UnboundedSender<DuplexStream>,
}

impl MockConnector {
    /// Create a connector that accepts connections, and the listener that
    /// receives the driver side of each one
    pub fn new() -> (Arc<Self>, MockDriverListener) {
        let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            refusing: AtomicBool::new(false),
            attempts: AtomicUsize::new(0),
            accepted_tx,
        });
        (connector, MockDriverListener { accepted_rx })
    }

    /// Make subsequent connection attempts fail (simulates the driver being down)
    pub fn set_refusing(&self, refusing: bool) {
        self.refusing.store(refusing, Ordering::SeqCst);
    }

    /// Total number of connection attempts, successful or not
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<BoxedStream, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.refusing.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionRefused(self.endpoint()));
        }

        let (gateway_side, driver_side) = tokio::io::duplex(PIPE_CAPACITY);
        self.accepted_tx
            .send(driver_side)
            .map_err(|_| TransportError::ConnectionFailed("mock listener dropped".into()))?;

        tracing::debug!("Mock transport: connection accepted");
        Ok(Box::new(gateway_side))
    }

    fn endpoint(&self) -> String {
        "mock".to_string()
    }
}

/// Receives the driver side of every connection made through a [`MockConnector`]
pub struct MockDriverListener {
    accepted_rx: mpsc::UnboundedReceiver<DuplexStream>,
}

impl MockDriverListener {
    /// Wait for the next connection
    pub async fn accept(&mut self) -> Option<DuplexStream> {
        self.accepted_rx.recv().await
    }

    /// Wait for the next connection, giving up after `timeout`
    pub async fn accept_within(&mut self, timeout: Duration) -> Option<DuplexStream> {
        tokio::time::timeout(timeout, self.accepted_rx.recv())
            .await
            .ok()
            .flatten()
    }
}

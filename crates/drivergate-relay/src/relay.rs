//! Message relay
//!
//! The relay is the always-running pump between the correlation queues and
//! the driver connection. Each iteration flushes every queued command, then
//! makes one bounded read. The read timeout bounds both how long a queued
//! command waits to be written and how quickly a stop request is noticed.
//! Writes are bounded too: a driver that stops reading fills the socket
//! buffer, and once the write timeout passes the connection counts as dead.
//!
//! On any I/O fault the connection is dropped and re-established by the
//! [`ConnectionManager`]. A command already taken off the queue when the
//! fault hits is not requeued: the driver may have acted on it, and not
//! every command is safe to repeat. Its caller simply times out.

use std::future::Future;
use std::time::Duration;

use drivergate_core::{DriverConfig, FrameDecoder, Framing};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::channels::RelayEndpoints;
use crate::connection::ConnectionManager;
use crate::transport::TransportError;

/// Moves commands onto the driver connection and replies back
pub struct MessageRelay {
    connection: ConnectionManager,
    endpoints: RelayEndpoints,
    framing: Framing,
    decoder: FrameDecoder,
    read_timeout: Duration,
    write_timeout: Duration,
    read_buffer_size: usize,
}

impl MessageRelay {
    pub fn new(
        connection: ConnectionManager,
        endpoints: RelayEndpoints,
        config: &DriverConfig,
    ) -> Self {
        Self {
            connection,
            endpoints,
            framing: config.framing,
            decoder: config.framing.decoder(),
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
            read_buffer_size: config.read_buffer_size.max(1),
        }
    }

    /// Run until the stop signal is raised
    ///
    /// Returns the queue endpoints so a later start can resume with the
    /// same queues.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> RelayEndpoints {
        info!(framing = %self.framing, "Message relay running");
        let mut buf = vec![0u8; self.read_buffer_size];

        loop {
            if *stop.borrow() {
                break;
            }
            if !self.connection.ensure_connected(&mut stop).await {
                break;
            }

            if let Err(e) = self.pump(&mut buf, &stop).await {
                warn!(%e, "Socket fault, dropping driver connection");
                self.connection.disconnect();
                self.decoder.reset();
            }
        }

        self.connection.close().await;
        info!("Message relay stopped");
        self.endpoints
    }

    /// One relay iteration: flush all queued commands, then one bounded read
    async fn pump(
        &mut self,
        buf: &mut [u8],
        stop: &watch::Receiver<bool>,
    ) -> Result<(), TransportError> {
        let Some(stream) = self.connection.stream_mut() else {
            return Ok(());
        };

        let mut wrote = false;
        while !*stop.borrow() {
            let Ok(command) = self.endpoints.commands.try_recv() else {
                break;
            };
            debug!(%command, ">> driver");
            let frame = self.framing.encode(&command);
            bounded_send(self.write_timeout, stream.write_all(&frame)).await?;
            wrote = true;
        }
        if wrote {
            bounded_send(self.write_timeout, stream.flush()).await?;
        }

        let n = match tokio::time::timeout(self.read_timeout, stream.read(buf)).await {
            // Nothing arrived; go back and flush
            Err(_) => return Ok(()),
            Ok(Ok(0)) => return Err(TransportError::ConnectionClosed),
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(TransportError::ReceiveFailed(e.to_string())),
        };

        for reply in self.decoder.push(&buf[..n]) {
            debug!(%reply, "<< driver");
            if self.endpoints.replies.send(reply).is_err() {
                warn!("Reply queue closed, dropping driver reply");
            }
        }
        Ok(())
    }
}

async fn bounded_send(
    limit: Duration,
    op: impl Future<Output = std::io::Result<()>>,
) -> Result<(), TransportError> {
    match tokio::time::timeout(limit, op).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(TransportError::SendFailed(e.to_string())),
        Err(_) => Err(TransportError::Timeout(format!(
            "driver accepted no data for {}ms",
            limit.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::RwLock;
    use tokio::io::DuplexStream;
    use tokio::task::JoinHandle;

    use crate::channels::{correlation_channels, GatewayEndpoints};
    use crate::connection::ConnectionState;
    use crate::transport::mock::{MockConnector, MockDriverListener};

    struct Harness {
        gateway: GatewayEndpoints,
        listener: MockDriverListener,
        connector: Arc<MockConnector>,
        state: Arc<RwLock<ConnectionState>>,
        stop_tx: watch::Sender<bool>,
        task: JoinHandle<RelayEndpoints>,
    }

    fn spawn_relay(framing: Framing) -> Harness {
        let (connector, listener) = MockConnector::new();
        let state = Arc::new(RwLock::new(ConnectionState::Disconnected));
        let config = DriverConfig {
            read_timeout_ms: 20,
            write_timeout_ms: 100,
            reconnect_interval_ms: 20,
            framing,
            ..Default::default()
        };
        let connection =
            ConnectionManager::new(connector.clone(), config.reconnect_interval(), state.clone());
        let (gateway, relay_side) = correlation_channels();
        let relay = MessageRelay::new(connection, relay_side, &config);
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(relay.run(stop_rx));
        Harness {
            gateway,
            listener,
            connector,
            state,
            stop_tx,
            task,
        }
    }

    async fn read_some(driver: &mut DuplexStream) -> String {
        let mut buf = [0u8; 1024];
        let n = tokio::time::timeout(Duration::from_secs(2), driver.read(&mut buf))
            .await
            .expect("driver read timed out")
            .unwrap();
        String::from_utf8_lossy(&buf[..n]).into_owned()
    }

    async fn next_reply(gateway: &mut GatewayEndpoints) -> String {
        tokio::time::timeout(Duration::from_secs(2), gateway.replies.recv())
            .await
            .expect("reply timed out")
            .expect("reply queue closed")
    }

    #[tokio::test]
    async fn test_command_out_reply_in() {
        let mut h = spawn_relay(Framing::Raw);
        let mut driver = h.listener.accept().await.unwrap();

        h.gateway.commands.send("ping".into()).unwrap();
        assert_eq!(read_some(&mut driver).await, "ping");
        driver.write_all(b"pong").await.unwrap();
        assert_eq!(next_reply(&mut h.gateway).await, "pong");
        assert_eq!(*h.state.read(), ConnectionState::Connected);

        h.stop_tx.send(true).unwrap();
        h.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_queued_commands_flushed_in_order() {
        let (connector, mut listener) = MockConnector::new();
        connector.set_refusing(true);
        let state = Arc::new(RwLock::new(ConnectionState::Disconnected));
        let config = DriverConfig {
            read_timeout_ms: 20,
            reconnect_interval_ms: 20,
            framing: Framing::Line,
            ..Default::default()
        };
        let connection =
            ConnectionManager::new(connector.clone(), config.reconnect_interval(), state);
        let (gateway, relay_side) = correlation_channels();
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(MessageRelay::new(connection, relay_side, &config).run(stop_rx));

        // Queue while the driver is unreachable
        for cmd in ["a", "b", "c"] {
            gateway.commands.send(cmd.into()).unwrap();
        }
        tokio::time::sleep(Duration::from_millis(60)).await;
        connector.set_refusing(false);

        let mut driver = listener.accept().await.unwrap();
        let mut received = String::new();
        while received.len() < "a\nb\nc\n".len() {
            received.push_str(&read_some(&mut driver).await);
        }
        assert_eq!(received, "a\nb\nc\n");

        stop_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_line_framing_splits_replies() {
        let mut h = spawn_relay(Framing::Line);
        let mut driver = h.listener.accept().await.unwrap();

        driver.write_all(b"state:idle\npo").await.unwrap();
        assert_eq!(next_reply(&mut h.gateway).await, "state:idle");
        driver.write_all(b"ng\n").await.unwrap();
        assert_eq!(next_reply(&mut h.gateway).await, "pong");

        h.stop_tx.send(true).unwrap();
        h.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_reconnects_after_driver_closes() {
        let mut h = spawn_relay(Framing::Raw);
        let driver = h.listener.accept().await.unwrap();
        drop(driver);

        // EOF is a fault: the relay must open a fresh connection
        let mut driver = h
            .listener
            .accept_within(Duration::from_secs(2))
            .await
            .expect("relay did not reconnect");
        assert_eq!(h.connector.attempts(), 2);

        h.gateway.commands.send("get_state".into()).unwrap();
        assert_eq!(read_some(&mut driver).await, "get_state");
        driver.write_all(b"state:idle").await.unwrap();
        assert_eq!(next_reply(&mut h.gateway).await, "state:idle");

        h.stop_tx.send(true).unwrap();
        h.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_closes_connection_and_returns_endpoints() {
        let h = spawn_relay(Framing::Raw);
        let mut listener = h.listener;
        let mut driver = listener.accept().await.unwrap();

        h.stop_tx.send(true).unwrap();
        let endpoints = tokio::time::timeout(Duration::from_secs(2), h.task)
            .await
            .expect("relay did not stop")
            .unwrap();
        assert_eq!(*h.state.read(), ConnectionState::Disconnected);

        let mut buf = [0u8; 4];
        assert_eq!(driver.read(&mut buf).await.unwrap(), 0);

        // Queues survive the relay
        h.gateway.commands.send("later".into()).unwrap();
        let mut commands = endpoints.commands;
        assert_eq!(commands.try_recv().unwrap(), "later");
    }

    #[tokio::test]
    async fn test_stop_while_unreachable() {
        let (connector, _listener) = MockConnector::new();
        connector.set_refusing(true);
        let config = DriverConfig {
            reconnect_interval_ms: 60_000,
            ..Default::default()
        };
        let connection = ConnectionManager::new(
            connector,
            config.reconnect_interval(),
            Arc::new(RwLock::new(ConnectionState::Disconnected)),
        );
        let (_gateway, relay_side) = correlation_channels();
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(MessageRelay::new(connection, relay_side, &config).run(stop_rx));

        tokio::time::sleep(Duration::from_millis(30)).await;
        stop_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("relay did not stop")
            .unwrap();
    }

    /// Hands out one scripted stream, then refuses
    struct ScriptedConnector {
        stream: parking_lot::Mutex<Option<tokio_test::io::Mock>>,
        attempts: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl crate::transport::Connector for ScriptedConnector {
        async fn connect(&self) -> Result<crate::transport::BoxedStream, TransportError> {
            self.attempts
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            match self.stream.lock().take() {
                Some(mock) => Ok(Box::new(mock)),
                None => Err(TransportError::ConnectionRefused(self.endpoint())),
            }
        }

        fn endpoint(&self) -> String {
            "scripted".to_string()
        }
    }

    #[tokio::test]
    async fn test_scripted_exchange_then_eof() {
        let mock = tokio_test::io::Builder::new()
            .write(b"ping\n")
            .read(b"pong\n")
            .build();
        let connector = Arc::new(ScriptedConnector {
            stream: parking_lot::Mutex::new(Some(mock)),
            attempts: Default::default(),
        });
        let state = Arc::new(RwLock::new(ConnectionState::Disconnected));
        let config = DriverConfig {
            read_timeout_ms: 20,
            reconnect_interval_ms: 20,
            framing: Framing::Line,
            ..Default::default()
        };
        let connection =
            ConnectionManager::new(connector.clone(), config.reconnect_interval(), state.clone());
        let (mut gateway, relay_side) = correlation_channels();
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(MessageRelay::new(connection, relay_side, &config).run(stop_rx));

        gateway.commands.send("ping".into()).unwrap();
        assert_eq!(next_reply(&mut gateway).await, "pong");

        // Script exhausted: EOF is a fault, the relay goes back to reconnecting
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while connector.attempts.load(std::sync::atomic::Ordering::SeqCst) < 2 {
            assert!(tokio::time::Instant::now() < deadline, "no reconnect attempt");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_ne!(*state.read(), ConnectionState::Connected);

        stop_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_stalled_driver_is_dropped_and_stop_returns() {
        let h = spawn_relay(Framing::Raw);
        let mut listener = h.listener;
        // Connected but never reads: the pipe fills up and writes block
        let _stalled = listener.accept().await.unwrap();

        let command = "x".repeat(8 * 1024);
        for _ in 0..20 {
            h.gateway.commands.send(command.clone()).unwrap();
        }

        // Write deadline passes, the connection is treated as dead
        let _next = listener
            .accept_within(Duration::from_secs(2))
            .await
            .expect("relay kept waiting on the stalled connection");
        assert!(h.connector.attempts() >= 2);

        h.stop_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(3), h.task)
            .await
            .expect("relay did not stop")
            .unwrap();
        assert_eq!(*h.state.read(), ConnectionState::Disconnected);
    }
}

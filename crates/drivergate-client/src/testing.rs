//! Test utilities for drivergate-client
//!
//! [`TestServer`] serves a gateway router on an ephemeral port and hands
//! back a [`DriverGateClient`] pointed at it. Tests that need the relay to
//! reach its driver first use [`TestServer::wait_until_connected`], which
//! goes through `GET /_status` like any other client would.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::{CommandResult, DriverGateClient, Result};

/// Client timeouts used by [`TestServer::start`]
const TEST_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const TEST_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
/// Interval between `/_status` polls
const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A gateway router served on a local port, shut down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    /// Client for the served router, including any path prefix
    pub client: DriverGateClient,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Serve a gateway router on an ephemeral local port
    ///
    /// # Example
    ///
    /// ```ignore
    /// use drivergate_client::testing::TestServer;
    /// use drivergate_api::{create_router, AppState};
    ///
    /// let server = TestServer::start(create_router(AppState::new(controller))).await?;
    /// assert!(server.wait_until_connected(Duration::from_secs(2)).await);
    /// let result = server.client.send("ping").await?;
    /// ```
    pub async fn start<S>(router: axum::Router<S>) -> Result<Self>
    where
        S: Clone + Send + Sync + 'static,
        axum::Router<S>: Into<axum::Router>,
    {
        Self::start_with_timeout(router, TEST_REQUEST_TIMEOUT, TEST_CONNECT_TIMEOUT).await
    }

    /// Serve with custom client timeouts
    pub async fn start_with_timeout<S>(
        router: axum::Router<S>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self>
    where
        S: Clone + Send + Sync + 'static,
        axum::Router<S>: Into<axum::Router>,
    {
        let (addr, shutdown_tx, handle) = serve(router.into()).await?;
        let base_url = format!("http://{}", addr);
        let client = DriverGateClient::with_config(&base_url, timeout, connect_timeout)?;
        Ok(Self {
            addr,
            client,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Serve the router under a path prefix, the way a reverse proxy would
    /// mount the gateway (e.g. `/gw`)
    ///
    /// The client's base URL carries the prefix.
    pub async fn start_under_prefix(prefix: &str, router: axum::Router) -> Result<Self> {
        let prefix = format!("/{}", prefix.trim_matches('/'));
        let (addr, shutdown_tx, handle) = serve(axum::Router::new().nest(&prefix, router)).await?;
        let client = DriverGateClient::with_config(
            &format!("http://{}{}/", addr, prefix),
            TEST_REQUEST_TIMEOUT,
            TEST_CONNECT_TIMEOUT,
        )?;
        Ok(Self {
            addr,
            client,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Root URL of the listener (without any prefix)
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Poll `GET /_status` until the gateway reports a driver connection
    ///
    /// Returns false if it does not within `timeout`. Failed status
    /// requests count as not connected.
    pub async fn wait_until_connected(&self, timeout: Duration) -> bool {
        wait_for(
            || async move {
                self.client
                    .status()
                    .await
                    .map(|status| status.is_connected())
                    .unwrap_or(false)
            },
            timeout,
        )
        .await
    }

    /// Send commands one after another, stopping at the first transport error
    pub async fn send_all(&self, commands: &[&str]) -> Result<Vec<CommandResult>> {
        let mut results = Vec::with_capacity(commands.len());
        for command in commands {
            results.push(self.client.send(command).await?);
        }
        Ok(results)
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

type Served = (SocketAddr, oneshot::Sender<()>, JoinHandle<()>);

async fn serve(router: axum::Router) -> Result<Served> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let handle = tokio::spawn(async move {
        let served = axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
        if let Err(e) = served {
            tracing::warn!(%e, "Test server failed");
        }
    });

    Ok((addr, shutdown_tx, handle))
}

/// Wait for a condition with timeout
pub async fn wait_for<F, Fut>(condition: F, timeout: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;

    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(STATUS_POLL_INTERVAL).await;
    }

    false
}

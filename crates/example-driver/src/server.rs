//! TCP front end of the simulated driver
//!
//! One task per accepted connection. Each message decoded from the stream is
//! processed by the shared device and answered on the same connection.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use drivergate_core::Framing;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::device::SimulatedDevice;

/// Read buffer per connection
const READ_BUFFER_SIZE: usize = 1024;

/// Bound listener plus the device it serves
pub struct DriverServer {
    listener: TcpListener,
    device: Arc<SimulatedDevice>,
    framing: Framing,
}

impl DriverServer {
    pub async fn bind(
        addr: &str,
        device: Arc<SimulatedDevice>,
        framing: Framing,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            device,
            framing,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` turns true
    ///
    /// Open connections are closed on shutdown as well.
    pub async fn serve(self, mut shutdown: watch::Receiver<bool>) -> io::Result<()> {
        info!(addr = %self.listener.local_addr()?, framing = %self.framing, "Driver listening");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!(%e, "Accept failed");
                            continue;
                        }
                    };
                    info!(%peer, "Client connected");
                    let device = self.device.clone();
                    let framing = self.framing;
                    let stop = shutdown.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, device, framing, stop).await {
                            debug!(%peer, %e, "Connection error");
                        }
                        info!(%peer, "Connection closed");
                    });
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Driver stopped");
        Ok(())
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    device: Arc<SimulatedDevice>,
    framing: Framing,
    mut shutdown: watch::Receiver<bool>,
) -> io::Result<()> {
    let mut decoder = framing.decoder();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let latency = device.profile().latency;

    loop {
        let n = tokio::select! {
            read = stream.read(&mut buf) => read?,
            _ = shutdown.changed() => 0,
        };
        if n == 0 {
            break;
        }

        for message in decoder.push(&buf[..n]) {
            let command = message.trim();
            if command.is_empty() {
                continue;
            }
            debug!(command, "<<");
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            let reply = device.process_command(command);
            debug!(reply = %reply, ">>");
            stream.write_all(&framing.encode(&reply)).await?;
        }
    }

    stream.shutdown().await
}

/// Handle to a driver running on a background task
pub struct DriverHandle {
    addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<io::Result<()>>,
}

impl DriverHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting, close open connections and wait for the listener task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}

/// Bind `addr` and serve on a background task
pub async fn spawn(
    addr: &str,
    device: Arc<SimulatedDevice>,
    framing: Framing,
) -> io::Result<DriverHandle> {
    let server = DriverServer::bind(addr, device, framing).await?;
    let addr = server.local_addr()?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(server.serve(shutdown_rx));
    Ok(DriverHandle {
        addr,
        shutdown_tx,
        task,
    })
}

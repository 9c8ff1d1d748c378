//! Request gateway
//!
//! Submits one command and waits, bounded, for the next reply. The wire
//! protocol carries no correlation id, so the whole submit+wait sequence
//! runs under one gateway-wide lock: at most one command is in flight, and
//! the reply popped is always the one for the command just pushed.
//!
//! The exchange runs in its own task that owns the lock. A caller that is
//! dropped mid-wait (an HTTP client hanging up) does not cut the exchange
//! short: the reply is still consumed by the command that caused it, and
//! the lock passes on only after that.
//!
//! A reply that arrives after its caller's deadline stays queued and is
//! consumed by the next caller; the queues are never cleared.

use std::sync::Arc;
use std::time::{Duration, Instant};

use drivergate_core::{Framing, GatewayReply};
use tokio::sync::{mpsc, Mutex, OwnedMutexGuard};
use tracing::{debug, error, warn};

use crate::channels::GatewayEndpoints;

type ReplyQueue = mpsc::UnboundedReceiver<String>;

/// Caller-facing handle onto the correlation queues
pub struct CommandGateway {
    commands: mpsc::UnboundedSender<String>,
    /// Held for the full submit+wait; tokio's mutex is fair, so callers
    /// are served in arrival order
    replies: Arc<Mutex<ReplyQueue>>,
    reply_timeout: Duration,
    framing: Framing,
}

impl CommandGateway {
    pub fn new(endpoints: GatewayEndpoints, reply_timeout: Duration) -> Self {
        Self {
            commands: endpoints.commands,
            replies: Arc::new(Mutex::new(endpoints.replies)),
            reply_timeout,
            framing: Framing::default(),
        }
    }

    /// Framing used on the driver connection; commands it cannot carry are
    /// refused without being sent
    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// Send a command and wait for its reply
    pub async fn handle(&self, command: &str) -> GatewayReply {
        if !self.framing.can_frame(command) {
            warn!(%command, framing = %self.framing, "Command cannot be framed, not sent");
            return GatewayReply::ValidationError;
        }

        let replies = self.replies.clone().lock_owned().await;
        let exchange = tokio::spawn(exchange(
            self.commands.clone(),
            replies,
            command.to_string(),
            self.reply_timeout,
        ));

        match exchange.await {
            Ok(reply) => reply,
            Err(e) => {
                error!(%command, %e, "Exchange task failed");
                GatewayReply::GatewayTimeout
            }
        }
    }
}

/// Push one command and pop one reply while holding the reply queue
async fn exchange(
    commands: mpsc::UnboundedSender<String>,
    mut replies: OwnedMutexGuard<ReplyQueue>,
    command: String,
    reply_timeout: Duration,
) -> GatewayReply {
    if commands.send(command.clone()).is_err() {
        warn!(%command, "Command queue closed");
        return GatewayReply::GatewayTimeout;
    }

    let started = Instant::now();
    match tokio::time::timeout(reply_timeout, replies.recv()).await {
        Ok(Some(reply)) => {
            debug!(
                %command,
                %reply,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Reply received"
            );
            GatewayReply::from_driver(reply)
        }
        Ok(None) => {
            warn!(%command, "Reply queue closed");
            GatewayReply::GatewayTimeout
        }
        Err(_) => {
            warn!(
                %command,
                timeout_ms = reply_timeout.as_millis() as u64,
                "No reply from driver before deadline"
            );
            GatewayReply::GatewayTimeout
        }
    }
}

//! Correlation channel pair
//!
//! Two unbounded FIFO queues connect callers to the relay: commands flow
//! out, replies flow back in. Neither queue carries a correlation id, so
//! the n-th reply belongs to the n-th command only as long as callers are
//! serialized (see [`CommandGateway`](crate::CommandGateway)).

use tokio::sync::mpsc;

/// The caller-facing ends: push commands, pop replies
pub struct GatewayEndpoints {
    pub commands: mpsc::UnboundedSender<String>,
    pub replies: mpsc::UnboundedReceiver<String>,
}

/// The relay-facing ends: pop commands, push replies
pub struct RelayEndpoints {
    pub commands: mpsc::UnboundedReceiver<String>,
    pub replies: mpsc::UnboundedSender<String>,
}

/// Create the commands-out / replies-in queue pair
pub fn correlation_channels() -> (GatewayEndpoints, RelayEndpoints) {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (replies_tx, replies_rx) = mpsc::unbounded_channel();
    (
        GatewayEndpoints {
            commands: commands_tx,
            replies: replies_rx,
        },
        RelayEndpoints {
            commands: commands_rx,
            replies: replies_tx,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queues_are_fifo() {
        let (mut gateway, mut relay) = correlation_channels();

        for cmd in ["a", "b", "c"] {
            gateway.commands.send(cmd.to_string()).unwrap();
        }
        assert_eq!(relay.commands.try_recv().unwrap(), "a");
        assert_eq!(relay.commands.try_recv().unwrap(), "b");
        assert_eq!(relay.commands.try_recv().unwrap(), "c");
        assert!(relay.commands.try_recv().is_err());

        relay.replies.send("1".into()).unwrap();
        relay.replies.send("2".into()).unwrap();
        assert_eq!(gateway.replies.recv().await.unwrap(), "1");
        assert_eq!(gateway.replies.recv().await.unwrap(), "2");
    }
}

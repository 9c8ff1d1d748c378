//! Demo command - walk the driver through a typical configuration session

use anyhow::Result;
use drivergate_client::DriverGateClient;

use crate::output::OutputContext;

/// Reset, inspect state, adjust focus and return to idle
const DEMO_SEQUENCE: &[&str] = &[
    "reset",
    "get_state",
    "ping",
    "set_state=config",
    "get_state",
    "get_config=focus",
    "set_config=focus:800",
    "get_config=focus",
    "set_state=idle",
];

pub async fn demo(client: &DriverGateClient, ctx: &OutputContext) -> Result<usize> {
    let commands: Vec<String> = DEMO_SEQUENCE.iter().map(|c| c.to_string()).collect();
    super::send(client, &commands, ctx).await
}

//! Status and health commands

use anyhow::Result;
use drivergate_client::DriverGateClient;

use crate::output::OutputContext;

/// Show connection and relay status
pub async fn status(client: &DriverGateClient, ctx: &OutputContext) -> Result<()> {
    let status = client.status().await?;
    println!("{}", ctx.status(&status));
    Ok(())
}

/// Check that the gateway answers
pub async fn health(client: &DriverGateClient) -> Result<()> {
    let body = client.health().await?;
    println!("{}", body);
    Ok(())
}

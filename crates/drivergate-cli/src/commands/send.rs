//! Send command - relay driver commands through the gateway

use anyhow::Result;
use drivergate_client::DriverGateClient;

use crate::output::OutputContext;

/// Send each command in order, printing one result per command
///
/// Returns the number of commands that did not answer 200.
pub async fn send(
    client: &DriverGateClient,
    commands: &[String],
    ctx: &OutputContext,
) -> Result<usize> {
    let mut failures = 0;
    for command in commands {
        let url = client.command_url(command)?;
        let result = client.send(command).await?;
        if !result.is_success() {
            failures += 1;
        }
        println!("{}", ctx.command(url.as_str(), &result));
    }
    Ok(failures)
}

//! drivergate CLI - Command-line tool for the driver gateway
//!
//! Sends driver commands through a running `drivergated` and prints the
//! timing, status and reply of each.

mod commands;
mod output;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use drivergate_client::DriverGateClient;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "drivergate-cli")]
#[command(author, version, about = "Driver gateway CLI")]
#[command(propagate_version = true)]
struct Cli {
    /// Gateway URL
    #[arg(
        short,
        long,
        env = "DRIVERGATE_URL",
        default_value = "http://localhost:7001"
    )]
    url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one or more commands to the driver, in order
    Send {
        /// Commands (e.g. `ping`, `set_config=focus:800`)
        #[arg(required = true)]
        commands: Vec<String>,
    },

    /// Show connection and relay status
    Status,

    /// Check that the gateway is up
    Health,

    /// Run a short configuration session against the driver
    Demo,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let client = create_client(&cli.url, Duration::from_secs(cli.timeout))?;
    let ctx = OutputContext::new(cli.output);

    let failures = match &cli.command {
        Commands::Send { commands } => commands::send(&client, commands, &ctx).await?,
        Commands::Status => {
            commands::status(&client, &ctx).await?;
            0
        }
        Commands::Health => {
            commands::health(&client).await?;
            0
        }
        Commands::Demo => commands::demo(&client, &ctx).await?,
    };

    Ok(if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn create_client(url: &str, timeout: Duration) -> Result<DriverGateClient> {
    DriverGateClient::with_config(url, timeout, Duration::from_secs(10))
        .with_context(|| format!("Invalid gateway URL: {}", url))
}

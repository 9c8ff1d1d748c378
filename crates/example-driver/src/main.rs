//! Example Driver Simulator
//!
//! Simulates the inspection-camera driver behind the gateway.
//!
//! # Usage
//!
//! ```bash
//! ./example-driver --port 6001
//! ./example-driver --framing line --latency-ms 150 --timeout-command get_frame
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use drivergate_core::Framing;
use example_driver::{DeviceProfile, DriverServer, SimulatedDevice};
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "example-driver")]
#[command(about = "Simulated camera driver for gateway development")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 6001)]
    port: u16,

    /// Message framing (raw or line)
    #[arg(long, default_value = "raw")]
    framing: Framing,

    /// Delay before each reply, in milliseconds
    #[arg(long, default_value_t = 0)]
    latency_ms: u64,

    /// Multiplier on the inspection time after a trigger
    #[arg(long, default_value_t = 1.0)]
    inspection_scale: f64,

    /// Commands that always answer with a hardware timeout (repeatable)
    #[arg(long = "timeout-command", value_name = "NAME")]
    timeout_commands: Vec<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        "example_driver=debug"
    } else {
        "example_driver=info"
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut profile = DeviceProfile::default()
        .with_latency(Duration::from_millis(args.latency_ms))
        .with_inspection_scale(args.inspection_scale);
    for name in args.timeout_commands {
        profile = profile.with_timeout_command(name);
    }

    info!(
        latency_ms = args.latency_ms,
        inspection_scale = profile.inspection_scale,
        timeout_commands = ?profile.timeout_commands,
        "Starting example driver"
    );

    let device = Arc::new(SimulatedDevice::new(profile));
    let addr = format!("{}:{}", args.host, args.port);
    let server = DriverServer::bind(&addr, device, args.framing)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                warn!(%e, "Cannot listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        }
    });

    server.serve(shutdown_rx).await.context("Driver server failed")?;
    Ok(())
}

//! drivergated - Driver Gateway Daemon
//!
//! Serves `GET /{command}` over HTTP and relays each command to the hardware
//! driver over a persistent byte-stream connection.
//!
//! Usage:
//!   drivergated [OPTIONS]
//!
//! Without `--config` the built-in defaults are used. Command-line options
//! and their environment variables override values from the file.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use drivergate_api::{create_router, AppState};
use drivergate_core::GatewayConfig;
use drivergate_relay::Controller;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "drivergated")]
#[command(about = "HTTP gateway for a byte-stream hardware driver")]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "DRIVERGATE_CONFIG")]
    config: Option<String>,

    /// Driver host
    #[arg(long, env = "DRIVERGATE_DRIVER_HOST")]
    driver_host: Option<String>,

    /// Driver port
    #[arg(long, env = "DRIVERGATE_DRIVER_PORT")]
    driver_port: Option<u16>,

    /// HTTP bind address
    #[arg(long, env = "DRIVERGATE_HOST")]
    host: Option<String>,

    /// HTTP port
    #[arg(short, long, env = "DRIVERGATE_PORT")]
    port: Option<u16>,

    /// Request worker threads
    #[arg(short, long, env = "DRIVERGATE_WORKERS")]
    workers: Option<usize>,

    /// Log relay and API activity at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "DRIVERGATE_JSON_LOGS")]
    json_logs: bool,
}

impl Args {
    fn load_config(&self) -> Result<GatewayConfig> {
        let mut config = match &self.config {
            Some(path) => GatewayConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path))?,
            None => GatewayConfig::default(),
        };

        if let Some(host) = &self.driver_host {
            config.driver.host = host.clone();
        }
        if let Some(port) = self.driver_port {
            config.driver.port = port;
        }
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(workers) = self.workers {
            config.server.workers = workers;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "drivergated=debug,drivergate_relay=debug,drivergate_api=debug,tower_http=debug"
    } else {
        "drivergated=info,drivergate_relay=info,drivergate_api=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(args.json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!args.json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    let config = args.load_config()?;

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.workers)
        .enable_all()
        .build()
        .context("Failed to build runtime")?
        .block_on(run(config))
}

async fn run(config: GatewayConfig) -> Result<()> {
    tracing::info!(
        driver = %config.driver.address(),
        framing = %config.driver.framing,
        reply_timeout_ms = config.gateway.reply_timeout_ms,
        workers = config.server.workers,
        "Starting drivergated"
    );

    let controller = Arc::new(Controller::from_config(&config));
    controller.start().await?;

    let state = AppState::new(controller.clone()).with_max_in_flight(config.server.workers);
    let app = create_router(state);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    controller.stop().await;
    tracing::info!("drivergated stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(%e, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(%e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

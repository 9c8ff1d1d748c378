//! Output formatting for CLI results

use clap::ValueEnum;
use drivergate_client::{CommandResult, GatewayStatus};
use serde::Serialize;

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Two tab-separated lines per command
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Serialize)]
struct CommandRecord<'a> {
    url: &'a str,
    command: &'a str,
    status: u16,
    body: &'a str,
    elapsed_ms: u64,
}

/// Context for output rendering
pub struct OutputContext {
    pub format: OutputFormat,
}

impl OutputContext {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render one command result
    pub fn command(&self, url: &str, result: &CommandResult) -> String {
        match self.format {
            OutputFormat::Text => format!(
                "{:.3}s\t{}\n{}\t{}",
                result.elapsed.as_secs_f64(),
                url,
                result.status,
                result.body
            ),
            OutputFormat::Json => {
                let record = CommandRecord {
                    url,
                    command: &result.command,
                    status: result.status,
                    body: &result.body,
                    elapsed_ms: result.elapsed.as_millis() as u64,
                };
                serde_json::to_string(&record).unwrap_or_default()
            }
        }
    }

    /// Render the gateway status
    pub fn status(&self, status: &GatewayStatus) -> String {
        match self.format {
            OutputFormat::Text => format!(
                "connection\t{}\nrelay\t{}\ndriver\t{}",
                status.connection,
                if status.relay_running { "running" } else { "stopped" },
                status.driver
            ),
            OutputFormat::Json => serde_json::to_string_pretty(status).unwrap_or_default(),
        }
    }
}

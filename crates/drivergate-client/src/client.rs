//! Gateway HTTP client implementation

use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use crate::error::{DriverGateClientError, Result};
use crate::types::*;

/// Default request timeout, above the gateway's default reply wait
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Driver gateway HTTP client
#[derive(Debug, Clone)]
pub struct DriverGateClient {
    client: Client,
    base_url: Url,
}

impl DriverGateClient {
    /// Create a new gateway client
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the gateway (e.g., "http://localhost:7001")
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(base_url, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a new gateway client with custom timeouts
    pub fn with_config(
        base_url: &str,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(DriverGateClientError::InvalidBaseUrl(base_url.to_string()));
        }

        Ok(Self { client, base_url })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL that carries `command` as a single path segment.
    ///
    /// `/`, `?`, `#` and `%` inside the command are percent-encoded so the
    /// gateway sees exactly one segment.
    pub fn command_url(&self, command: &str) -> Result<Url> {
        self.segment_url(command)
    }

    /// Append one segment to the base URL, keeping any path prefix
    fn segment_url(&self, segment: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DriverGateClientError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Send one command to the driver through the gateway
    ///
    /// Validation errors (400) and timeouts (408) are returned as a
    /// [`CommandResult`]; only transport failures and statuses outside the
    /// gateway protocol are errors.
    #[instrument(skip(self))]
    pub async fn send(&self, command: &str) -> Result<CommandResult> {
        let url = self.command_url(command)?;
        debug!("Sending command to {}", url);

        let started = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        let elapsed = started.elapsed();

        match status {
            StatusCode::OK | StatusCode::BAD_REQUEST | StatusCode::REQUEST_TIMEOUT => {
                Ok(CommandResult {
                    command: command.to_string(),
                    status: status.as_u16(),
                    body,
                    elapsed,
                })
            }
            _ => Err(DriverGateClientError::server_error(status.as_u16(), body)),
        }
    }

    // =========================================================================
    // Gateway Endpoints
    // =========================================================================

    /// Check gateway health
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<String> {
        let url = self.segment_url("_health")?;
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(response.text().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(DriverGateClientError::server_error(status.as_u16(), body))
        }
    }

    /// Fetch connection and relay status
    #[instrument(skip(self))]
    pub async fn status(&self) -> Result<GatewayStatus> {
        let url = self.segment_url("_status")?;
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| DriverGateClientError::ParseError(e.to_string()))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(DriverGateClientError::server_error(status.as_u16(), body))
        }
    }
}

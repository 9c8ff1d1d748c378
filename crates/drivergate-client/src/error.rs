//! Error types for gateway client operations

use thiserror::Error;

/// Result type alias for gateway client operations
pub type Result<T> = std::result::Result<T, DriverGateClientError>;

/// Errors that can occur during gateway client operations
#[derive(Error, Debug)]
pub enum DriverGateClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Base URL cannot take path segments (e.g. `mailto:`)
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// Failed to parse response body
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Server returned a status outside the gateway protocol
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },
}

impl DriverGateClientError {
    /// Create a server error from status code and message
    pub fn server_error(status: u16, message: impl Into<String>) -> Self {
        Self::ServerError {
            status,
            message: message.into(),
        }
    }
}

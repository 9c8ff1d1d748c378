//! Driver reply classification
//!
//! The driver answers every command with an opaque string. Two values are
//! reserved and select a non-200 status; everything else is passed through
//! as a successful reply. The decision is made once, here, when the reply
//! leaves the relay.

/// Driver reply signalling that the hardware did not answer in time
pub const TIMEOUT_ERROR_SENTINEL: &str = "timeout_error";
/// Driver reply signalling that the command was rejected
pub const VALIDATION_ERROR_SENTINEL: &str = "validation_error";
/// Body returned when the gateway itself gives up waiting
pub const GATEWAY_TIMEOUT_BODY: &str = "timeout";

/// Outcome of one gateway command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayReply {
    /// Any reply other than a sentinel, carried verbatim
    Success(String),
    /// Driver replied `validation_error`
    ValidationError,
    /// Driver replied `timeout_error`
    DriverTimeout,
    /// No reply arrived before the deadline
    GatewayTimeout,
}

impl GatewayReply {
    /// Classify a raw driver reply (exact match, no trimming)
    pub fn from_driver(reply: impl Into<String>) -> Self {
        let reply = reply.into();
        match reply.as_str() {
            TIMEOUT_ERROR_SENTINEL => Self::DriverTimeout,
            VALIDATION_ERROR_SENTINEL => Self::ValidationError,
            _ => Self::Success(reply),
        }
    }

    /// HTTP-style status code for this outcome
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Success(_) => 200,
            Self::ValidationError => 400,
            Self::DriverTimeout | Self::GatewayTimeout => 408,
        }
    }

    /// Response body for this outcome
    pub fn body(&self) -> &str {
        match self {
            Self::Success(body) => body,
            Self::ValidationError => VALIDATION_ERROR_SENTINEL,
            Self::DriverTimeout => TIMEOUT_ERROR_SENTINEL,
            Self::GatewayTimeout => GATEWAY_TIMEOUT_BODY,
        }
    }

    /// Split into `(body, status)`
    pub fn into_parts(self) -> (String, u16) {
        let status = self.status_code();
        let body = match self {
            Self::Success(body) => body,
            other => other.body().to_string(),
        };
        (body, status)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

//! Reply to HTTP response conversion

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use drivergate_core::GatewayReply;

/// HTTP response for one relayed command
#[derive(Debug)]
pub struct CommandResponse(pub GatewayReply);

impl IntoResponse for CommandResponse {
    fn into_response(self) -> Response {
        let (body, code) = self.0.into_parts();
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Log non-success outcomes at appropriate levels
        if status == StatusCode::REQUEST_TIMEOUT {
            tracing::warn!(%body, "Command timed out");
        } else if status.is_client_error() {
            tracing::debug!(%body, "Command rejected by driver");
        }

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (GatewayReply::Success("pong".into()), StatusCode::OK),
            (GatewayReply::ValidationError, StatusCode::BAD_REQUEST),
            (GatewayReply::DriverTimeout, StatusCode::REQUEST_TIMEOUT),
            (GatewayReply::GatewayTimeout, StatusCode::REQUEST_TIMEOUT),
        ];
        for (reply, expected) in cases {
            assert_eq!(CommandResponse(reply).into_response().status(), expected);
        }
    }
}

//! Request handlers

use axum::extract::{Path, State};
use axum::Json;
use drivergate_relay::ControllerStatus;

use crate::response::CommandResponse;
use crate::state::AppState;

/// GET /{command}
///
/// Relays the (percent-decoded) path segment verbatim to the driver.
pub async fn send_command(
    State(state): State<AppState>,
    Path(command): Path<String>,
) -> CommandResponse {
    tracing::debug!(%command, "Command received");
    CommandResponse(state.controller().handle(&command).await)
}

/// GET /_health
pub async fn health() -> &'static str {
    "OK"
}

/// GET /_status
pub async fn status(State(state): State<AppState>) -> Json<ControllerStatus> {
    Json(state.controller().status().await)
}

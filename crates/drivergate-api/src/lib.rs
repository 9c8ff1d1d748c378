//! drivergate-api - HTTP front end for the driver gateway
//!
//! Every request path segment is one opaque command for the driver. The
//! layer does no parsing of its own: it hands the decoded segment to the
//! [`Controller`](drivergate_relay::Controller) and turns the classified
//! reply into a status code and plain-text body.
//!
//! # Usage
//!
//! ```ignore
//! use drivergate_api::{create_router, AppState};
//! use drivergate_relay::Controller;
//!
//! let controller = Arc::new(Controller::from_config(&config));
//! controller.start().await?;
//! let router = create_router(AppState::new(controller));
//! ```

pub mod handlers;
pub mod response;
pub mod state;

pub use response::CommandResponse;
pub use state::AppState;

use axum::routing::get;
use axum::Router;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the gateway router with the given application state
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_in_flight = state.max_in_flight();

    Router::new()
        // Gateway endpoints (underscore keeps them apart from driver commands)
        .route("/_health", get(handlers::health))
        .route("/_status", get(handlers::status))
        // One path segment = one driver command
        .route("/{command}", get(handlers::send_command))
        // Middleware
        .layer(GlobalConcurrencyLimitLayer::new(max_in_flight))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

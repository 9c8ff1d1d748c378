//! Application state for the gateway API

use std::sync::Arc;

use drivergate_core::ServerConfig;
use drivergate_relay::Controller;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    controller: Arc<Controller>,
    /// Upper bound on concurrently served requests
    max_in_flight: usize,
}

impl AppState {
    pub fn new(controller: Arc<Controller>) -> Self {
        Self {
            controller,
            max_in_flight: ServerConfig::default().workers,
        }
    }

    /// Set the request worker limit (values below 1 are raised to 1)
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    pub fn controller(&self) -> &Arc<Controller> {
        &self.controller
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }
}

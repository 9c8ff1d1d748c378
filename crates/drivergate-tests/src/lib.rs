//! End-to-end tests for the driver gateway
//!
//! The tests run the whole stack in one process:
//! - `example-driver` serving a simulated device on an ephemeral TCP port
//! - a `Controller` relaying to it over a real socket
//! - the HTTP router on a `TestServer`, driven through `DriverGateClient`
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p drivergate-tests
//! ```
//!
//! Tests that reuse a fixed port are marked `#[serial]`.
//!
//! # Test Structure
//!
//! - `e2e_test.rs` - request/reply scenarios, reconnect, lifecycle

// This crate only contains tests, no library code

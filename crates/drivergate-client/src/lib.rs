//! drivergate Client Library
//!
//! Provides a typed HTTP client for the driver gateway.
//!
//! # Example
//!
//! ```rust,no_run
//! use drivergate_client::DriverGateClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = DriverGateClient::new("http://localhost:7001")?;
//!
//!     let result = client.send("get_state").await?;
//!     println!("{}\t{}", result.status, result.body);
//!
//!     Ok(())
//! }
//! ```
//!
//! Status codes 400 and 408 are part of the gateway protocol and come back
//! as a [`CommandResult`], not as an error.
//!
//! # Testing
//!
//! The `testing` module provides utilities for integration testing:
//!
//! ```rust,ignore
//! use drivergate_client::testing::TestServer;
//! use drivergate_api::{create_router, AppState};
//!
//! let server = TestServer::start(create_router(state)).await?;
//! let result = server.client.send("ping").await?;
//! ```

mod client;
mod error;
pub mod testing;
mod types;

pub use client::DriverGateClient;
pub use error::{DriverGateClientError, Result};
pub use types::*;

//! drivergate-core - Core types for the driver gateway
//!
//! This crate holds the pieces shared by the relay, the HTTP layer and the
//! example driver:
//!
//! - [`GatewayConfig`] and its sections, loaded from TOML
//! - [`GatewayReply`], the closed classification of a driver reply
//! - [`Framing`] and [`FrameDecoder`] for the byte-stream wire
//!
//! # Architecture
//!
//! ```text
//!  caller ──► CommandGateway ──► commands-out ──► MessageRelay ──► driver
//!  caller ◄── GatewayReply  ◄── replies-in   ◄── MessageRelay ◄── driver
//! ```

pub mod config;
pub mod error;
pub mod framing;
pub mod reply;

pub use config::{DriverConfig, GatewayConfig, GatewaySection, ServerConfig};
pub use error::ConfigError;
pub use framing::{FrameDecoder, Framing};
pub use reply::{
    GatewayReply, GATEWAY_TIMEOUT_BODY, TIMEOUT_ERROR_SENTINEL, VALIDATION_ERROR_SENTINEL,
};

//! Command implementations for drivergate-cli

pub mod demo;
pub mod send;
pub mod status;

pub use demo::demo;
pub use send::send;
pub use status::{health, status};

//! example-driver - Simulated Camera Driver Library
//!
//! A stand-in for the real hardware driver during gateway development and
//! testing. It speaks the same byte-stream protocol: one command in, one
//! reply out, with `validation_error` and `timeout_error` as failure replies.
//!
//! # Modules
//!
//! - [`validator`] - Command grammar, device states and parameter rules
//! - [`device`] - Simulated device (capture timeline, frames, fault injection)
//! - [`server`] - TCP listener serving the device

pub mod device;
pub mod server;
pub mod validator;

pub use device::{DeviceProfile, SimulatedDevice};
pub use server::{spawn, DriverHandle, DriverServer};
pub use validator::{Command, CommandValidator, ConfigParam, DeviceState, Rejection};

//! Simulated inspection device
//!
//! Holds the validator, the capture timeline and the frame counter behind a
//! single lock, so every connection sees the same device.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use drivergate_core::{TIMEOUT_ERROR_SENTINEL, VALIDATION_ERROR_SENTINEL};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::validator::{Command, CommandValidator, ConfigParam, DeviceState};

/// Inspection time with photometric mode off
const INSPECTION_TIME_STANDARD: Duration = Duration::from_millis(2500);
/// Inspection time with photometric mode on
const INSPECTION_TIME_PHOTOMETRIC: Duration = Duration::from_millis(4000);

/// Timing and fault-injection knobs
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    /// Delay before each reply
    pub latency: Duration,
    /// Multiplier on the inspection times (0 completes captures immediately)
    pub inspection_scale: f64,
    /// Commands (by base name) that always answer with a hardware timeout
    pub timeout_commands: HashSet<String>,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            latency: Duration::ZERO,
            inspection_scale: 1.0,
            timeout_commands: HashSet::new(),
        }
    }
}

impl DeviceProfile {
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Negative or non-finite scales are treated as 0
    pub fn with_inspection_scale(mut self, scale: f64) -> Self {
        self.inspection_scale = sanitize_scale(scale);
        self
    }

    pub fn with_timeout_command(mut self, name: impl Into<String>) -> Self {
        self.timeout_commands.insert(name.into());
        self
    }

    fn inspection_time(&self, photometric: bool) -> Duration {
        let base = if photometric {
            INSPECTION_TIME_PHOTOMETRIC
        } else {
            INSPECTION_TIME_STANDARD
        };
        base.mul_f64(sanitize_scale(self.inspection_scale))
    }
}

fn sanitize_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        0.0
    }
}

struct DeviceInner {
    validator: CommandValidator,
    capture_until: Option<Instant>,
    frames_captured: u64,
    frame_ready: bool,
}

/// A simulated camera device
pub struct SimulatedDevice {
    profile: DeviceProfile,
    inner: Mutex<DeviceInner>,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new(DeviceProfile::default())
    }
}

impl SimulatedDevice {
    pub fn new(profile: DeviceProfile) -> Self {
        Self {
            profile,
            inner: Mutex::new(DeviceInner {
                validator: CommandValidator::new(),
                capture_until: None,
                frames_captured: 0,
                frame_ready: false,
            }),
        }
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn state(&self) -> DeviceState {
        let mut inner = self.inner.lock();
        Self::advance(&mut inner);
        inner.validator.state()
    }

    /// Process one command and produce the reply text
    pub fn process_command(&self, raw: &str) -> String {
        let mut inner = self.inner.lock();
        Self::advance(&mut inner);

        let command = match inner.validator.validate(raw) {
            Ok(command) => command,
            Err(rejection) => {
                debug!(command = raw, %rejection, "Command rejected");
                return VALIDATION_ERROR_SENTINEL.to_string();
            }
        };

        if self.profile.timeout_commands.contains(command.name()) {
            debug!(command = raw, "Simulated hardware timeout");
            return TIMEOUT_ERROR_SENTINEL.to_string();
        }

        match &command {
            Command::Ping => "pong".to_string(),
            Command::GetState => format!("state:{}", inner.validator.state()),
            Command::SetState(state) => {
                inner.validator.apply(&command);
                format!("state:{}", state)
            }
            Command::GetConfig(param) => {
                format!("{}:{}", param.as_str(), inner.validator.config_value(*param))
            }
            Command::SetConfig(param, value) => {
                let reply = format!("{}:{}", param.as_str(), value);
                inner.validator.apply(&command);
                reply
            }
            Command::Trigger => {
                let photometric =
                    inner.validator.config_value(ConfigParam::PhotometricMode) == "1";
                let inspection = self.profile.inspection_time(photometric);
                inner.validator.begin_capture();
                inner.capture_until = Some(Instant::now() + inspection);
                inner.frame_ready = false;
                info!(
                    inspection_ms = inspection.as_millis() as u64,
                    photometric, "Capture started"
                );
                "trigger_ack".to_string()
            }
            Command::GetFrame => {
                if inner.frame_ready {
                    inner.frame_ready = false;
                    format!("frame:{}", inner.frames_captured)
                } else {
                    "no_frame".to_string()
                }
            }
            Command::Reset => {
                inner.validator.apply(&command);
                inner.capture_until = None;
                inner.frame_ready = false;
                info!("Device reset to defaults");
                "reset_ack".to_string()
            }
        }
    }

    /// Finish a capture whose inspection time has elapsed
    fn advance(inner: &mut DeviceInner) {
        if let Some(until) = inner.capture_until {
            if Instant::now() >= until {
                inner.capture_until = None;
                inner.validator.end_capture();
                inner.frames_captured += 1;
                inner.frame_ready = true;
                debug!(frame = inner.frames_captured, "Frame available");
            }
        }
    }
}

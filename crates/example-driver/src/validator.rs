//! Command grammar and state rules of the simulated device
//!
//! A command is accepted only if its base name is allowed in the current
//! device state and its argument passes the per-parameter value rules.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Operating state of the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeviceState {
    #[default]
    Idle,
    Config,
    /// Entered by `trigger` only, never through `set_state`
    Capturing,
}

impl DeviceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Config => "config",
            Self::Capturing => "capturing",
        }
    }

    fn allows(&self, name: &str) -> bool {
        let allowed: &[&str] = match self {
            Self::Idle => &["ping", "trigger", "get_frame", "get_state", "set_state", "reset"],
            Self::Config => &[
                "ping",
                "get_state",
                "set_state",
                "get_config",
                "set_config",
                "reset",
            ],
            Self::Capturing => &["ping", "get_state", "reset"],
        };
        allowed.contains(&name)
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceState {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "config" => Ok(Self::Config),
            "capturing" => Ok(Self::Capturing),
            other => Err(Rejection::UnknownState(other.to_string())),
        }
    }
}

/// Configurable camera parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigParam {
    Focus,
    Exposure,
    Gain,
    LedPattern,
    LedIntensity,
    PhotometricMode,
}

impl ConfigParam {
    pub const ALL: [ConfigParam; 6] = [
        Self::Focus,
        Self::Exposure,
        Self::Gain,
        Self::LedPattern,
        Self::LedIntensity,
        Self::PhotometricMode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::Exposure => "exposure",
            Self::Gain => "gain",
            Self::LedPattern => "led_pattern",
            Self::LedIntensity => "led_intensity",
            Self::PhotometricMode => "photometric_mode",
        }
    }

    /// Power-on value
    pub fn default_value(&self) -> &'static str {
        match self {
            Self::Focus => "800",
            Self::Exposure => "100.0",
            Self::Gain => "+0",
            // a = all LEDs off
            Self::LedPattern => "a",
            Self::LedIntensity => "128",
            Self::PhotometricMode => "0",
        }
    }

    /// Check the textual value against this parameter's range and format
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            Self::Focus => plain_uint(value, 1600),
            Self::Exposure => exposure(value),
            Self::Gain => signed_gain(value),
            Self::LedPattern => matches!(value.as_bytes(), [b'a'..=b'h']),
            Self::LedIntensity => plain_uint(value, 255),
            Self::PhotometricMode => value == "0" || value == "1",
        }
    }
}

impl FromStr for ConfigParam {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Rejection::UnknownParameter(s.to_string()))
    }
}

/// Unsigned integer without leading zeros, at most `max`
fn plain_uint(value: &str, max: u32) -> bool {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if value.len() > 1 && value.starts_with('0') {
        return false;
    }
    value.parse::<u32>().is_ok_and(|v| v <= max)
}

/// 0.0 to 1000.0: up to three integer digits with an optional single
/// decimal, or exactly `1000.0`
fn exposure(value: &str) -> bool {
    if value == "1000.0" {
        return true;
    }
    let (int, frac) = match value.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (value, None),
    };
    let int_ok = (1..=3).contains(&int.len()) && int.bytes().all(|b| b.is_ascii_digit());
    let frac_ok = match frac {
        None => true,
        Some(f) => f.len() == 1 && f.bytes().all(|b| b.is_ascii_digit()),
    };
    int_ok && frac_ok
}

/// Explicitly signed integer in -12..=+12
fn signed_gain(value: &str) -> bool {
    let Some(magnitude) = value.strip_prefix('+').or_else(|| value.strip_prefix('-')) else {
        return false;
    };
    plain_uint(magnitude, 12)
}

/// A command that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    Trigger,
    GetFrame,
    GetState,
    SetState(DeviceState),
    GetConfig(ConfigParam),
    SetConfig(ConfigParam, String),
    Reset,
}

impl Command {
    /// Base name, without argument
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Trigger => "trigger",
            Self::GetFrame => "get_frame",
            Self::GetState => "get_state",
            Self::SetState(_) => "set_state",
            Self::GetConfig(_) => "get_config",
            Self::SetConfig(..) => "set_config",
            Self::Reset => "reset",
        }
    }
}

/// Why a command was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("'{command}' not allowed in state {state}")]
    NotAllowed { command: String, state: DeviceState },

    #[error("malformed argument for '{0}'")]
    MalformedArgument(String),

    #[error("unknown state: {0}")]
    UnknownState(String),

    #[error("state '{0}' cannot be set directly")]
    ForbiddenState(DeviceState),

    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("invalid value '{value}' for {param}")]
    InvalidValue { param: &'static str, value: String },

    #[error("{0}")]
    Interlock(&'static str),
}

/// Parses commands and enforces state and configuration rules
#[derive(Debug, Clone)]
pub struct CommandValidator {
    state: DeviceState,
    config: BTreeMap<ConfigParam, String>,
}

impl Default for CommandValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandValidator {
    pub fn new() -> Self {
        let config = ConfigParam::ALL
            .into_iter()
            .map(|p| (p, p.default_value().to_string()))
            .collect();
        Self {
            state: DeviceState::Idle,
            config,
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn config_value(&self, param: ConfigParam) -> &str {
        self.config
            .get(&param)
            .map(String::as_str)
            .unwrap_or_else(|| param.default_value())
    }

    /// Parse and check `raw` without changing any state
    pub fn validate(&self, raw: &str) -> Result<Command, Rejection> {
        let (name, argument) = match raw.split_once('=') {
            Some((name, arg)) => (name, Some(arg)),
            None => (raw, None),
        };

        if !self.state.allows(name) {
            return Err(if is_known_command(name) {
                Rejection::NotAllowed {
                    command: name.to_string(),
                    state: self.state,
                }
            } else {
                Rejection::UnknownCommand(name.to_string())
            });
        }

        match (name, argument) {
            ("ping", None) => Ok(Command::Ping),
            ("trigger", None) => Ok(Command::Trigger),
            ("get_frame", None) => Ok(Command::GetFrame),
            ("get_state", None) => Ok(Command::GetState),
            ("reset", None) => Ok(Command::Reset),
            ("set_state", Some(arg)) => {
                let state: DeviceState = arg.parse()?;
                if state == DeviceState::Capturing {
                    return Err(Rejection::ForbiddenState(state));
                }
                Ok(Command::SetState(state))
            }
            ("get_config", Some(arg)) => Ok(Command::GetConfig(arg.parse()?)),
            ("set_config", Some(arg)) => {
                let (param, value) = arg
                    .split_once(':')
                    .ok_or_else(|| Rejection::MalformedArgument(name.to_string()))?;
                let param: ConfigParam = param.parse()?;
                self.check_config(param, value)?;
                Ok(Command::SetConfig(param, value.to_string()))
            }
            _ => Err(Rejection::MalformedArgument(name.to_string())),
        }
    }

    fn check_config(&self, param: ConfigParam, value: &str) -> Result<(), Rejection> {
        if !param.accepts(value) {
            return Err(Rejection::InvalidValue {
                param: param.as_str(),
                value: value.to_string(),
            });
        }
        if param == ConfigParam::PhotometricMode
            && value == "1"
            && self.config_value(ConfigParam::LedPattern) != "a"
        {
            return Err(Rejection::Interlock(
                "photometric_mode=1 requires led_pattern=a",
            ));
        }
        if param == ConfigParam::LedPattern
            && self.config_value(ConfigParam::PhotometricMode) == "1"
        {
            return Err(Rejection::Interlock(
                "led_pattern is locked while photometric_mode=1",
            ));
        }
        Ok(())
    }

    /// Apply the state effects of a validated command
    pub fn apply(&mut self, command: &Command) {
        match command {
            Command::SetState(state) => self.state = *state,
            Command::SetConfig(param, value) => {
                self.config.insert(*param, value.clone());
            }
            Command::Reset => *self = Self::new(),
            _ => {}
        }
    }

    pub(crate) fn begin_capture(&mut self) {
        self.state = DeviceState::Capturing;
    }

    pub(crate) fn end_capture(&mut self) {
        if self.state == DeviceState::Capturing {
            self.state = DeviceState::Idle;
        }
    }
}

fn is_known_command(name: &str) -> bool {
    matches!(
        name,
        "ping"
            | "trigger"
            | "get_frame"
            | "get_state"
            | "set_state"
            | "get_config"
            | "set_config"
            | "reset"
    )
}

//! Unified error types for the respirator firmware.
//!
//! A single `Error` enum that every subsystem converts into, so the boot
//! path handles failures uniformly.  Clinical out-of-range conditions are
//! *not* errors: they are alarm signals (see [`crate::alarms`]).  All
//! variants are `Copy` so they pass through the control path without
//! allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Construction-time configuration is invalid.  Fatal: the device
    /// must not ventilate with a controller built from it.
    Config(ConfigError),
    /// An actuator command failed.
    Actuator(ActuatorError),
    /// A pressure sample could not be acquired or was not usable.
    Sensor(SensorError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Respiratory rate is zero or outside the device-safe range.
    CyclesPerMinuteOutOfRange(u16),
    /// `min_peep_command < max_plateau_pressure < max_peak_pressure` violated.
    PressureBoundsOrder,
    /// A pressure bound is negative, non-finite or above the device limit.
    PressureOutOfRange(&'static str),
    /// A cycle timing fraction is not strictly between 0 and 1.
    TimingRatio(&'static str),
    /// A PID gain is negative or non-finite.
    PidGain(&'static str),
    /// Blower speed range is empty or above the ESC command range.
    BlowerRange,
    /// Pressure transducer filter or scale has a zero divisor.
    SensorCalibration,
    /// Control period is zero.
    ControlPeriod,
    /// Stored configuration could not be decoded.
    Corrupted,
    /// Persistent storage could not be read or written.
    Storage,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CyclesPerMinuteOutOfRange(cpm) => {
                write!(f, "cycles per minute {cpm} out of range")
            }
            Self::PressureBoundsOrder => {
                write!(f, "expected min PEEP < max plateau < max peak")
            }
            Self::PressureOutOfRange(field) => write!(f, "{field} out of range"),
            Self::TimingRatio(field) => write!(f, "timing ratio {field} must be in (0, 1)"),
            Self::PidGain(field) => write!(f, "PID gain {field} invalid"),
            Self::BlowerRange => write!(f, "blower speed range invalid"),
            Self::SensorCalibration => write!(f, "pressure sensor calibration invalid"),
            Self::ControlPeriod => write!(f, "control period must be non-zero"),
            Self::Corrupted => write!(f, "stored config corrupted"),
            Self::Storage => write!(f, "config storage unavailable"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// PWM duty-cycle write failed.
    PwmWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// ADC read returned an error or timed out.
    AdcReadFailed,
    /// Sample is NaN or infinite.
    NotFinite,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::NotFinite => write!(f, "sample not finite"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

//! System configuration parameters
//!
//! All tunable parameters for the respirator.  Pressures are in cmH2O,
//! durations in microseconds unless the field name says otherwise.
//! Values are loaded once at boot (JSON or postcard from the storage
//! collaborator) and are immutable for the controller's lifetime.

use core::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Device-safe respiratory rate range (cycles per minute).
pub const CYCLES_PER_MINUTE_RANGE: RangeInclusive<u16> = 5..=35;

/// Highest pressure bound the device accepts (cmH2O).
pub const MAX_PRESSURE_CMH2O: f32 = 70.0;

/// Highest command the blower ESC understands.
pub const BLOWER_COMMAND_MAX: u16 = 180;

/// Clinical ventilation targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VentilationSettings {
    /// Target respiratory rate.
    pub cycles_per_minute: u16,
    /// PEEP the controller supports during exhalation.
    pub min_peep_command: f32,
    /// Inspiratory target and plateau alarm threshold.
    pub max_plateau_pressure: f32,
    /// Pressure relief target and peak alarm threshold.
    pub max_peak_pressure: f32,
}

impl Default for VentilationSettings {
    fn default() -> Self {
        Self {
            cycles_per_minute: 20,
            min_peep_command: 8.0,
            max_plateau_pressure: 30.0,
            max_peak_pressure: 32.0,
        }
    }
}

impl VentilationSettings {
    /// Check the construction-time invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !CYCLES_PER_MINUTE_RANGE.contains(&self.cycles_per_minute) {
            return Err(ConfigError::CyclesPerMinuteOutOfRange(self.cycles_per_minute));
        }
        check_pressure("min_peep_command", self.min_peep_command)?;
        check_pressure("max_plateau_pressure", self.max_plateau_pressure)?;
        check_pressure("max_peak_pressure", self.max_peak_pressure)?;
        if !(self.min_peep_command < self.max_plateau_pressure
            && self.max_plateau_pressure < self.max_peak_pressure)
        {
            return Err(ConfigError::PressureBoundsOrder);
        }
        Ok(())
    }
}

fn check_pressure(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=MAX_PRESSURE_CMH2O).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::PressureOutOfRange(field))
    }
}

/// Fractions that split one respiratory cycle into sub-phases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleTiming {
    /// Share of the cycle spent in inhalation (inspiration + hold).
    pub inhalation_ratio: f32,
    /// Share of the inhalation spent in active inspiration.
    pub inspiration_ratio: f32,
}

impl Default for CycleTiming {
    fn default() -> Self {
        Self {
            inhalation_ratio: 1.0 / 3.0,
            inspiration_ratio: 0.8,
        }
    }
}

impl CycleTiming {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, ratio) in [
            ("inhalation_ratio", self.inhalation_ratio),
            ("inspiration_ratio", self.inspiration_ratio),
        ] {
            if !(ratio.is_finite() && ratio > 0.0 && ratio < 1.0) {
                return Err(ConfigError::TimingRatio(field));
            }
        }
        Ok(())
    }
}

/// Gains for one PID loop.  Output unit is valve degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl PidGains {
    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        let ok = [self.kp, self.ki, self.kd]
            .iter()
            .all(|g| g.is_finite() && *g >= 0.0);
        if ok { Ok(()) } else { Err(ConfigError::PidGain(field)) }
    }
}

/// Blower ESC command range and per-cycle ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlowerSettings {
    pub initial_speed: u16,
    pub min_speed: u16,
    pub max_speed: u16,
    /// Speed change applied at a cycle start when the last cycle missed
    /// or overshot its pressure target.
    pub ramp_step: u16,
}

impl Default for BlowerSettings {
    fn default() -> Self {
        Self {
            initial_speed: 170,
            min_speed: 95,
            max_speed: BLOWER_COMMAND_MAX,
            ramp_step: 5,
        }
    }
}

impl BlowerSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        let range = self.min_speed..=self.max_speed;
        if self.min_speed >= self.max_speed
            || self.max_speed > BLOWER_COMMAND_MAX
            || !range.contains(&self.initial_speed)
        {
            return Err(ConfigError::BlowerRange);
        }
        Ok(())
    }
}

/// Servo angle calibration shared by both pinch valves (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValveCalibration {
    pub open_angle: u16,
    pub close_angle: u16,
}

impl Default for ValveCalibration {
    fn default() -> Self {
        Self {
            open_angle: 25,
            close_angle: 145,
        }
    }
}

/// Raw ADC to cmH2O conversion for the pressure transducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PressureCalibration {
    /// First-order filter divider applied to raw counts.
    pub filter_divider: i32,
    /// Scale numerator, raw counts to mmH2O.
    pub scale_num: i32,
    /// Scale denominator, raw counts to mmH2O.
    pub scale_den: i32,
    /// Offset subtracted after scaling (mmH2O).
    pub offset_mmh2o: i32,
}

impl Default for PressureCalibration {
    fn default() -> Self {
        Self {
            filter_divider: 5,
            scale_num: 8774,
            scale_den: 10_000,
            offset_mmh2o: 45,
        }
    }
}

impl PressureCalibration {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.filter_divider < 1 || self.scale_den < 1 {
            return Err(ConfigError::SensorCalibration);
        }
        Ok(())
    }
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    pub ventilation: VentilationSettings,
    pub timing: CycleTiming,
    pub blower_pid: PidGains,
    pub patient_pid: PidGains,
    pub blower: BlowerSettings,
    pub valves: ValveCalibration,
    pub pressure_sensor: PressureCalibration,
    /// Offset above PEEP at which the patient valve starts venting.
    pub peep_margin_cmh2o: f32,
    /// Control loop period (microseconds).
    pub control_period_us: u32,
    /// Task watchdog timeout (milliseconds).
    pub watchdog_timeout_ms: u32,
    /// Telemetry report interval (control ticks).
    pub telemetry_interval_ticks: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            ventilation: VentilationSettings::default(),
            timing: CycleTiming::default(),
            blower_pid: PidGains {
                kp: 5.0,
                ki: 40.0,
                kd: 0.01,
            },
            patient_pid: PidGains {
                kp: 75.0,
                ki: 120.0,
                kd: 0.01,
            },
            blower: BlowerSettings::default(),
            valves: ValveCalibration::default(),
            pressure_sensor: PressureCalibration::default(),
            peep_margin_cmh2o: 2.0,
            control_period_us: 10_000,   // 100 Hz
            watchdog_timeout_ms: 1_000,
            telemetry_interval_ticks: 100, // 1 Hz
        }
    }
}

impl SystemConfig {
    /// Validate every field the controller depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ventilation.validate()?;
        self.timing.validate()?;
        self.blower_pid.validate("blower")?;
        self.patient_pid.validate("patient")?;
        self.blower.validate()?;
        self.pressure_sensor.validate()?;
        if !(self.peep_margin_cmh2o.is_finite() && self.peep_margin_cmh2o >= 0.0) {
            return Err(ConfigError::PressureOutOfRange("peep_margin_cmh2o"));
        }
        if self.control_period_us == 0 {
            return Err(ConfigError::ControlPeriod);
        }
        Ok(())
    }

    /// Decode and validate a JSON document from the storage collaborator.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(bytes).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }

    /// Decode and validate a postcard blob from the storage collaborator.
    pub fn from_postcard(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }

    /// Decode a stored blob: JSON when written by a provisioning tool,
    /// postcard otherwise.
    pub fn from_stored(bytes: &[u8]) -> Result<Self, ConfigError> {
        match bytes.first() {
            Some(b'{') => Self::from_json(bytes),
            _ => Self::from_postcard(bytes),
        }
    }

    /// Encode for persistent storage.
    pub fn to_postcard(&self) -> Result<Vec<u8>, ConfigError> {
        postcard::to_allocvec(self).map_err(|_| ConfigError::Corrupted)
    }
}

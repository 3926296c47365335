//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ PressureController / VentilatorService
//! ```
//!
//! Drivers (valves, blower, pressure sensor) and event sinks implement
//! these traits.  The controller consumes them via generics, so the
//! control core never touches hardware directly and every test can run
//! against in-memory doubles.

use crate::config::SystemConfig;
use crate::error::{ConfigError, SensorError};

// ───────────────────────────────────────────────────────────────
// Actuator ports (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// A proportional valve positioned by an aperture angle (degrees).
///
/// Commands are fire-and-forget: the valve applies them within the tick
/// and never reports completion.  Out-of-range angles are clamped to the
/// calibrated range, never rejected.
pub trait ValveActuator {
    /// Drive the valve to `angle`, clamped to the calibrated range.
    fn set_aperture(&mut self, angle: u16);

    /// Last commanded angle.
    fn aperture(&self) -> u16;

    /// Calibrated fully-open angle.
    fn open_angle(&self) -> u16;

    /// Calibrated fully-closed angle.
    fn close_angle(&self) -> u16;

    /// Distance between the closed and open angles.
    fn span(&self) -> u16 {
        self.open_angle().abs_diff(self.close_angle())
    }

    /// Angle for an opening of `opening` degrees away from closed.
    fn angle_for_opening(&self, opening: f32) -> u16 {
        let opening = opening.clamp(0.0, f32::from(self.span())).round() as u16;
        if self.open_angle() < self.close_angle() {
            self.close_angle() - opening
        } else {
            self.close_angle() + opening
        }
    }

    fn open(&mut self) {
        self.set_aperture(self.open_angle());
    }

    fn close(&mut self) {
        self.set_aperture(self.close_angle());
    }
}

/// The blower motor, driven by a speed command.
pub trait BlowerActuator {
    /// Set the speed command, clamped to the configured range.
    fn set_speed(&mut self, command: u16);

    /// Last applied speed command (0 when stopped).
    fn speed(&self) -> u16;

    /// Stop the motor.
    fn stop(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Source of filtered pressure samples.
pub trait PressureSource {
    /// Latest pressure in cmH2O.  The sample must be latched atomically so
    /// the whole tick sees one consistent value.
    fn read_pressure(&mut self) -> Result<f32, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log,
/// display, alarm panel).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Config port (driven adapter: domain ↔ persistent storage)
// ───────────────────────────────────────────────────────────────

/// Persistent home of the [`SystemConfig`].
pub trait ConfigStore {
    /// Stored configuration, or the defaults when nothing is stored yet.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist `config`.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

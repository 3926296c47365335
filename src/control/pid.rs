//! PID controller for valve aperture regulation
//!
//! Discrete proportional-integral-derivative controller.  The derivative
//! acts on the measurement rather than the error, so a setpoint change
//! between sub-phases does not kick the output.  The integral is clamped
//! so its contribution alone can never push the output past its limits.

use crate::config::PidGains;

/// Sign convention of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Output grows when the measurement is below target.
    Direct,
    /// Output grows when the measurement is above target (relief valves).
    Reverse,
}

/// PID controller
#[derive(Debug, Clone)]
pub struct PidController {
    kp: f32,
    ki: f32,
    kd: f32,
    action: Action,
    setpoint: f32,
    integral: f32,
    last_error: f32,
    last_output: f32,
    output_min: f32,
    output_max: f32,
}

impl PidController {
    pub fn new(gains: &PidGains, action: Action) -> Self {
        Self {
            kp: gains.kp,
            ki: gains.ki,
            kd: gains.kd,
            action,
            setpoint: 0.0,
            integral: 0.0,
            last_error: 0.0,
            last_output: 0.0,
            output_min: 0.0,
            output_max: 100.0,
        }
    }

    /// Set output limits
    pub fn set_limits(&mut self, min: f32, max: f32) {
        self.output_min = min.min(max);
        self.output_max = max.max(min);
        self.last_output = self.last_output.clamp(self.output_min, self.output_max);
    }

    /// Update setpoint
    pub fn set_target(&mut self, setpoint: f32) {
        self.setpoint = setpoint;
    }

    /// Compute PID output given the current measurement.
    ///
    /// `previous` is the measurement of the previous tick; without one the
    /// derivative term is skipped.  `dt` is in seconds.
    pub fn compute(&mut self, measurement: f32, previous: Option<f32>, dt: f32) -> f32 {
        let error = match self.action {
            Action::Direct => self.setpoint - measurement,
            Action::Reverse => measurement - self.setpoint,
        };

        // Proportional
        let p = self.kp * error;

        // Integral (with anti-windup)
        if dt > 0.0 {
            self.integral += error * dt;
            if self.ki > 0.0 {
                self.integral = self
                    .integral
                    .clamp(self.output_min / self.ki, self.output_max / self.ki);
            }
        }
        let i = self.ki * self.integral;

        // Derivative on measurement
        let derivative = match previous {
            Some(prev) if dt > 0.0 => {
                let rate = (measurement - prev) / dt;
                match self.action {
                    Action::Direct => -rate,
                    Action::Reverse => rate,
                }
            }
            _ => 0.0,
        };
        let d = self.kd * derivative;

        self.last_error = error;

        // Clamp output
        let raw = p + i + d;
        // Overflow to ±inf saturates; only NaN holds the previous output.
        let output = if raw.is_nan() {
            self.last_output
        } else {
            raw.clamp(self.output_min, self.output_max)
        };
        self.last_output = output;
        output
    }

    /// Reset controller state
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
        self.last_output = self.output_min;
    }

    pub fn target(&self) -> f32 {
        self.setpoint
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn last_error(&self) -> f32 {
        self.last_error
    }

    pub fn last_output(&self) -> f32 {
        self.last_output
    }

    pub fn limits(&self) -> (f32, f32) {
        (self.output_min, self.output_max)
    }

    /// True when the last output sat on its upper limit.
    pub fn is_saturated_high(&self) -> bool {
        self.last_output >= self.output_max
    }
}

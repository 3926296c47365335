//! Pinch-valve servo driver.
//!
//! One instance per valve (blower side and patient side).  The valve is a
//! hobby servo squeezing the tube; its aperture is an angle between the
//! calibrated open and close positions.  All servos share one LEDC timer,
//! each on its own channel.
//!
//! ## Dual-target design
//!
//! The driver is generic over [`SetDutyCycle`]: on ESP-IDF it wraps an
//! LEDC channel, on host/test an in-memory double.

use embedded_hal::pwm::SetDutyCycle;
use log::warn;

use crate::app::ports::ValveActuator;
use crate::config::ValveCalibration;
use crate::drivers::servo;

pub struct PressureValve<C> {
    pwm: C,
    timer_channel: u32,
    servo_pin: i32,
    open_angle: u16,
    close_angle: u16,
    /// Last commanded angle.
    command: u16,
    /// Angle actually written to the channel, `None` before the first write.
    applied: Option<u16>,
}

impl<C: SetDutyCycle> PressureValve<C> {
    /// Bind a valve to its PWM channel.  Nothing is written until the
    /// first aperture command.
    pub fn new(pwm: C, timer_channel: u32, servo_pin: i32, calibration: ValveCalibration) -> Self {
        Self {
            pwm,
            timer_channel,
            servo_pin,
            open_angle: calibration.open_angle.min(servo::COMMAND_MAX),
            close_angle: calibration.close_angle.min(servo::COMMAND_MAX),
            command: calibration.close_angle.min(servo::COMMAND_MAX),
            applied: None,
        }
    }

    fn clamp_angle(&self, angle: u16) -> u16 {
        let lo = self.open_angle.min(self.close_angle);
        let hi = self.open_angle.max(self.close_angle);
        angle.clamp(lo, hi)
    }

    /// Write the commanded angle if the channel does not already hold it.
    fn execute(&mut self) {
        if self.applied == Some(self.command) {
            return;
        }
        match servo::write_command(&mut self.pwm, self.command) {
            Ok(()) => self.applied = Some(self.command),
            // Leave `applied` stale so the next tick retries.
            Err(e) => warn!(
                "valve ch{} (gpio {}): {} writing {} deg",
                self.timer_channel, self.servo_pin, e, self.command
            ),
        }
    }

    pub fn applied(&self) -> Option<u16> {
        self.applied
    }

    pub fn timer_channel(&self) -> u32 {
        self.timer_channel
    }

    pub fn servo_pin(&self) -> i32 {
        self.servo_pin
    }

    pub fn pwm(&self) -> &C {
        &self.pwm
    }
}

impl<C: SetDutyCycle> ValveActuator for PressureValve<C> {
    fn set_aperture(&mut self, angle: u16) {
        self.command = self.clamp_angle(angle);
        self.execute();
    }

    fn aperture(&self) -> u16 {
        self.command
    }

    fn open_angle(&self) -> u16 {
        self.open_angle
    }

    fn close_angle(&self) -> u16 {
        self.close_angle
    }
}

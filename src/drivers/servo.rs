//! RC servo / ESC pulse encoding.
//!
//! Both pinch-valve servos and the blower ESC take a 1000–2000 µs pulse
//! every 20 ms frame.  Commands are 0–180 (degrees for a servo, throttle
//! steps for the ESC) mapped linearly onto that pulse range.

use embedded_hal::pwm::SetDutyCycle;

use crate::error::ActuatorError;

/// Servo frame period (µs).
pub const FRAME_PERIOD_US: u16 = 20_000;
/// Pulse width for command 0 (µs).
pub const PULSE_MIN_US: u16 = 1_000;
/// Pulse width for command [`COMMAND_MAX`] (µs).
pub const PULSE_MAX_US: u16 = 2_000;
/// Largest command a servo or ESC accepts.
pub const COMMAND_MAX: u16 = 180;

/// Pulse width for `command`, saturating at [`COMMAND_MAX`].
pub fn pulse_width_us(command: u16) -> u16 {
    let command = u32::from(command.min(COMMAND_MAX));
    let span = u32::from(PULSE_MAX_US - PULSE_MIN_US);
    PULSE_MIN_US + (command * span / u32::from(COMMAND_MAX)) as u16
}

/// Write the pulse for `command` to a PWM channel running the servo frame.
pub fn write_command<C: SetDutyCycle>(pwm: &mut C, command: u16) -> Result<(), ActuatorError> {
    pwm.set_duty_cycle_fraction(pulse_width_us(command), FRAME_PERIOD_US)
        .map_err(|_| ActuatorError::PwmWriteFailed)
}

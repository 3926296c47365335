//! Blower motor driver (RC-style ESC).
//!
//! Speed command 0–180 on the shared servo timer.  The ESC arms at the
//! minimum pulse, so `stop()` sends command 0 rather than silencing the
//! channel.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: an LEDC channel.  On host/test: an in-memory PWM double.

use embedded_hal::pwm::SetDutyCycle;
use log::{info, warn};

use crate::app::ports::BlowerActuator;
use crate::config::BlowerSettings;
use crate::drivers::servo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlowerState {
    Stopped,
    Running { speed: u16 },
}

pub struct Blower<C> {
    pwm: C,
    min_speed: u16,
    max_speed: u16,
    state: BlowerState,
}

impl<C: SetDutyCycle> Blower<C> {
    pub fn new(pwm: C, settings: &BlowerSettings) -> Self {
        Self {
            pwm,
            min_speed: settings.min_speed,
            max_speed: settings.max_speed.min(servo::COMMAND_MAX),
            state: BlowerState::Stopped,
        }
    }

    pub fn state(&self) -> BlowerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        !matches!(self.state, BlowerState::Stopped)
    }

    pub fn pwm(&self) -> &C {
        &self.pwm
    }

    fn write(&mut self, command: u16) -> bool {
        match servo::write_command(&mut self.pwm, command) {
            Ok(()) => true,
            Err(e) => {
                warn!("blower: {} writing speed {}", e, command);
                false
            }
        }
    }
}

impl<C: SetDutyCycle> BlowerActuator for Blower<C> {
    fn set_speed(&mut self, command: u16) {
        let speed = command.clamp(self.min_speed, self.max_speed);
        if self.state == (BlowerState::Running { speed }) {
            return;
        }
        if self.write(speed) {
            if !self.is_running() {
                info!("blower: started at {}", speed);
            }
            self.state = BlowerState::Running { speed };
        }
    }

    fn speed(&self) -> u16 {
        match self.state {
            BlowerState::Stopped => 0,
            BlowerState::Running { speed } => speed,
        }
    }

    fn stop(&mut self) {
        if self.write(0) && self.is_running() {
            info!("blower: stopped");
        }
        self.state = BlowerState::Stopped;
    }
}

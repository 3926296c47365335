//! Actuator drivers, hardware initialisation, and peripheral helpers.

pub mod blower;
pub mod hw_init;
pub mod hw_timer;
pub mod pressure_valve;
pub mod servo;
pub mod watchdog;

//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (front panel,
//! serial console) that the
//! [`VentilatorService`](super::service::VentilatorService) acts upon.

use crate::alarms::AlarmCode;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Start (or resume) ventilation from a fresh cycle.
    Start,

    /// Stop the blower and vent the patient circuit.
    Stop,

    /// Operator acknowledgement of one alarm.
    ClearAlarm(AlarmCode),
}

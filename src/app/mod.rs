//! Application core — pure domain logic, zero I/O.
//!
//! Tick orchestration around the pressure controller: start/stop, event
//! emission, telemetry.  All interaction with hardware happens through
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;

//! Pressure regulation: PID loops, sample history and the controller core.

pub mod history;
pub mod pid;
pub mod pressure_controller;

pub use pressure_controller::{CycleStats, PressureController, TickOutcome};

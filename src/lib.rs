//! Respirator firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod alarms;
pub mod app;
pub mod config;
pub mod control;
pub mod cycle;
pub mod error;
pub mod pins;

// The actual peripheral implementations are guarded by cfg attributes
// inside; on host they fall back to in-memory simulation.
pub mod adapters;
pub mod drivers;
pub mod sensors;

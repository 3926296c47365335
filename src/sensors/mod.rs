//! Sensor drivers.

pub mod pressure;

//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter          | Implements       | Connects to              |
//! |------------------|------------------|--------------------------|
//! | `log_sink`       | EventSink        | Serial log output        |
//! | `nvs`            | ConfigStore      | NVS flash config blob    |
//!
//! The actuator and sensor ports are implemented directly by the drivers
//! (`drivers::pressure_valve`, `drivers::blower`, `sensors::pressure`).

pub mod log_sink;
pub mod nvs;

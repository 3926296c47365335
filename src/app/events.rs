//! Outbound application events.
//!
//! The [`VentilatorService`](super::service::VentilatorService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on the
//! other side decide what to do with them: log to serial, drive an alarm
//! panel, feed a display.

use heapless::Vec;

use crate::alarms::{ALARM_COUNT, AlarmCode, AlarmPriority};
use crate::config::VentilationSettings;
use crate::control::CycleStats;
use crate::cycle::{CyclePhase, CycleSubPhase};

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Ventilation started (carries the initial sub-phase).
    Started(CycleSubPhase),

    /// Ventilation stopped; blower off, patient circuit vented.
    Stopped,

    /// The cycle state machine moved to the next sub-phase.
    SubPhaseChanged {
        cycle: u32,
        from: CycleSubPhase,
        to: CycleSubPhase,
    },

    /// A respiratory cycle finished; carries its latched statistics.
    CycleCompleted(CycleStats),

    /// An alarm became active.
    AlarmRaised {
        code: AlarmCode,
        priority: AlarmPriority,
        cycle: u32,
    },

    /// An alarm stopped being active.
    AlarmCleared { code: AlarmCode, cycle: u32 },

    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),
}

/// A point-in-time telemetry snapshot suitable for logging or display.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryData {
    pub cycle: u32,
    pub phase: CyclePhase,
    pub sub_phase: CycleSubPhase,
    pub pressure: f32,
    pub smoothed_pressure: f32,
    pub peak_pressure: f32,
    pub plateau_pressure: f32,
    pub peep: f32,
    pub blower_valve_angle: u16,
    pub patient_valve_angle: u16,
    pub blower_speed: u16,
    /// Active alarm codes, ascending.
    pub alarms: Vec<u8, ALARM_COUNT>,
}

/// Values a display refreshes once per cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineSnapshot {
    pub cycle: u32,
    pub previous_peak_pressure: f32,
    pub previous_plateau_pressure: f32,
    pub previous_peep: f32,
    pub current_alarms: Vec<u8, ALARM_COUNT>,
    pub previous_cycle_alarms: Vec<u8, ALARM_COUNT>,
    pub settings: VentilationSettings,
}

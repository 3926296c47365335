//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! An alarm panel or display adapter would implement the same trait.

use log::{error, info, warn};

use crate::alarms::AlarmPriority;
use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | cycle={} {:?} | P={:.1} (avg {:.1}) cmH2O | \
                     peak={:.1} plateau={:.1} peep={:.1} | \
                     valves={}/{}\u{00b0} blower={} | alarms={:?}",
                    t.cycle,
                    t.sub_phase,
                    t.pressure,
                    t.smoothed_pressure,
                    t.peak_pressure,
                    t.plateau_pressure,
                    t.peep,
                    t.blower_valve_angle,
                    t.patient_valve_angle,
                    t.blower_speed,
                    t.alarms,
                );
            }
            AppEvent::SubPhaseChanged { cycle, from, to } => {
                info!("PHASE | cycle {} {:?} -> {:?}", cycle, from, to);
            }
            AppEvent::CycleCompleted(s) => {
                info!(
                    "CYCLE | {} peak={:.1} plateau={:.1} peep={:.1}",
                    s.cycle, s.peak_pressure, s.plateau_pressure, s.peep
                );
            }
            AppEvent::AlarmRaised { code, priority, cycle } => match priority {
                AlarmPriority::High => error!("ALARM | {} raised (cycle {})", code, cycle),
                _ => warn!("ALARM | {} raised [{:?}] (cycle {})", code, priority, cycle),
            },
            AppEvent::AlarmCleared { code, cycle } => {
                info!("ALARM | {} cleared (cycle {})", code, cycle);
            }
            AppEvent::Started(sub_phase) => {
                info!("START | initial_sub_phase={:?}", sub_phase);
            }
            AppEvent::Stopped => {
                info!("STOP | blower off, patient valve open");
            }
        }
    }
}

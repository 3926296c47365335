//! Application service — the hexagonal core.
//!
//! [`VentilatorService`] wraps the pressure controller with a start/stop
//! lifecycle and turns controller changes into [`AppEvent`]s.  All I/O
//! flows through port traits injected at call sites, making the entire
//! service testable with mock adapters.
//!
//! ```text
//!  PressureSource ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                     │     VentilatorService     │
//!  Valves · Blower ◀──│  PressureController · PID │
//!                     └──────────────────────────┘
//! ```

use log::{info, warn};

use crate::alarms::AlarmSet;
use crate::config::SystemConfig;
use crate::control::{PressureController, TickOutcome};
use crate::cycle::Transition;

use super::commands::AppCommand;
use super::events::{AppEvent, MachineSnapshot, TelemetryData};
use super::ports::{BlowerActuator, EventSink, PressureSource, ValveActuator};

// ───────────────────────────────────────────────────────────────
// VentilatorService
// ───────────────────────────────────────────────────────────────

pub struct VentilatorService<'a, V, B> {
    controller: PressureController<'a, V, B>,
    control_period_us: u32,
    telemetry_interval_ticks: u32,
    running: bool,
    /// Set once ventilation has run, so the next start begins a new cycle.
    has_run: bool,
    tick_count: u64,
    sensor_faults: u32,
}

impl<'a, V: ValveActuator, B: BlowerActuator> VentilatorService<'a, V, B> {
    /// Wrap a controller.  Does **not** start ventilation — call
    /// [`start`](Self::start) next.
    pub fn new(controller: PressureController<'a, V, B>, config: &SystemConfig) -> Self {
        Self {
            controller,
            control_period_us: config.control_period_us,
            telemetry_interval_ticks: config.telemetry_interval_ticks,
            running: false,
            has_run: false,
            tick_count: 0,
            sensor_faults: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        if self.running {
            return;
        }
        if self.has_run {
            // Restart drops every alarm; report them as cleared.
            let alarms_before = self.controller.alarms().active();
            self.controller.restart();
            let alarms_after = self.controller.alarms().active();
            self.emit_alarm_changes(alarms_before, alarms_after, sink);
        } else {
            self.controller.setup();
        }
        self.running = true;
        self.has_run = true;
        let sub_phase = self.controller.sub_phase();
        sink.emit(&AppEvent::Started(sub_phase));
        info!("VentilatorService started in {:?}", sub_phase);
    }

    pub fn stop(&mut self, sink: &mut impl EventSink) {
        if !self.running {
            return;
        }
        self.controller.safe_stop();
        self.running = false;
        sink.emit(&AppEvent::Stopped);
        info!("VentilatorService stopped after {} ticks", self.tick_count);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control period: read pressure → controller → events.
    ///
    /// Returns `None` while stopped.  A failed sensor read reuses the
    /// previous pressure; regulation never pauses for it.
    pub fn tick(
        &mut self,
        source: &mut impl PressureSource,
        sink: &mut impl EventSink,
    ) -> Option<TickOutcome> {
        if !self.running {
            return None;
        }
        self.tick_count += 1;

        let sample = match source.read_pressure() {
            Ok(p) => p,
            Err(e) => {
                self.sensor_faults = self.sensor_faults.saturating_add(1);
                warn!("pressure read failed: {}", e);
                self.controller.pressure()
            }
        };

        let alarms_before = self.controller.alarms().active();
        let outcome = self.controller.tick(sample, self.control_period_us);

        if let Some(t) = outcome.transition {
            sink.emit(&AppEvent::SubPhaseChanged {
                cycle: self.controller.cycle_number(),
                from: t.from_state().sub_phase(),
                to: t.to_state().sub_phase(),
            });
            if t == Transition::ExhaleToInspiration {
                if let Some(stats) = self.controller.last_cycle() {
                    sink.emit(&AppEvent::CycleCompleted(stats));
                }
            }
        }

        self.emit_alarm_changes(alarms_before, outcome.active_alarms, sink);

        if self.telemetry_interval_ticks > 0
            && self.tick_count % u64::from(self.telemetry_interval_ticks) == 0
        {
            sink.emit(&AppEvent::Telemetry(self.build_telemetry()));
        }

        Some(outcome)
    }

    fn emit_alarm_changes(&self, before: AlarmSet, after: AlarmSet, sink: &mut impl EventSink) {
        let alarms = self.controller.alarms();
        let cycle = self.controller.cycle_number();
        for code in after.difference(before).iter() {
            sink.emit(&AppEvent::AlarmRaised {
                code,
                priority: code.priority(),
                cycle: alarms.raised_at_cycle(code).unwrap_or(cycle),
            });
        }
        for code in before.difference(after).iter() {
            sink.emit(&AppEvent::AlarmCleared { code, cycle });
        }
    }

    // ── Command handling ──────────────────────────────────────

    pub fn handle_command(&mut self, cmd: AppCommand, sink: &mut impl EventSink) {
        match cmd {
            AppCommand::Start => self.start(sink),
            AppCommand::Stop => self.stop(sink),
            AppCommand::ClearAlarm(code) => {
                if self.controller.alarms().is_active(code) {
                    self.controller.clear_alarm(code);
                    sink.emit(&AppEvent::AlarmCleared {
                        code,
                        cycle: self.controller.cycle_number(),
                    });
                }
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a telemetry snapshot from the controller.
    pub fn build_telemetry(&self) -> TelemetryData {
        let c = &self.controller;
        TelemetryData {
            cycle: c.cycle_number(),
            phase: c.phase(),
            sub_phase: c.sub_phase(),
            pressure: c.pressure(),
            smoothed_pressure: c.smoothed_pressure(),
            peak_pressure: c.peak_pressure(),
            plateau_pressure: c.plateau_pressure(),
            peep: c.peep(),
            blower_valve_angle: c.blower_valve().aperture(),
            patient_valve_angle: c.patient_valve().aperture(),
            blower_speed: c.blower().speed(),
            alarms: c.alarms().active().codes(),
        }
    }

    /// Statistics of the last finished cycle plus both alarm sets.
    pub fn machine_snapshot(&self) -> MachineSnapshot {
        let c = &self.controller;
        let last = c.last_cycle().unwrap_or_default();
        MachineSnapshot {
            cycle: c.cycle_number(),
            previous_peak_pressure: last.peak_pressure,
            previous_plateau_pressure: last.plateau_pressure,
            previous_peep: last.peep,
            current_alarms: c.alarms().active().codes(),
            previous_cycle_alarms: c.alarms().previous_cycle_alarms().codes(),
            settings: *c.settings(),
        }
    }

    pub fn controller(&self) -> &PressureController<'a, V, B> {
        &self.controller
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Control ticks executed while running.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Failed pressure reads since boot.
    pub fn sensor_faults(&self) -> u32 {
        self.sensor_faults
    }
}

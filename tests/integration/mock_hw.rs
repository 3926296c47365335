//! Mock hardware adapters for integration tests.
//!
//! Records every actuator call so tests can assert on the full command
//! history without touching real PWM registers.

#![allow(dead_code)]

use std::collections::VecDeque;

use respirator::alarms::AlarmController;
use respirator::app::events::AppEvent;
use respirator::app::ports::{BlowerActuator, EventSink, PressureSource, ValveActuator};
use respirator::app::service::VentilatorService;
use respirator::config::{SystemConfig, ValveCalibration};
use respirator::control::PressureController;
use respirator::error::SensorError;

// ── MockValve ─────────────────────────────────────────────────

pub struct MockValve {
    pub cal: ValveCalibration,
    pub angle: u16,
    /// Every angle commanded, after clamping.
    pub calls: Vec<u16>,
}

impl MockValve {
    pub fn new() -> Self {
        let cal = ValveCalibration::default();
        Self {
            cal,
            angle: cal.close_angle,
            calls: Vec::new(),
        }
    }
}

impl ValveActuator for MockValve {
    fn set_aperture(&mut self, angle: u16) {
        let lo = self.cal.open_angle.min(self.cal.close_angle);
        let hi = self.cal.open_angle.max(self.cal.close_angle);
        self.angle = angle.clamp(lo, hi);
        self.calls.push(self.angle);
    }

    fn aperture(&self) -> u16 {
        self.angle
    }

    fn open_angle(&self) -> u16 {
        self.cal.open_angle
    }

    fn close_angle(&self) -> u16 {
        self.cal.close_angle
    }
}

// ── MockBlower ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlowerCall {
    SetSpeed(u16),
    Stop,
}

pub struct MockBlower {
    pub speed: u16,
    pub calls: Vec<BlowerCall>,
}

impl MockBlower {
    pub fn new() -> Self {
        Self {
            speed: 0,
            calls: Vec::new(),
        }
    }
}

impl BlowerActuator for MockBlower {
    fn set_speed(&mut self, command: u16) {
        self.speed = command;
        self.calls.push(BlowerCall::SetSpeed(command));
    }

    fn speed(&self) -> u16 {
        self.speed
    }

    fn stop(&mut self) {
        self.speed = 0;
        self.calls.push(BlowerCall::Stop);
    }
}

// ── ScriptedPressure ─────────────────────────────────────────

/// Pressure source that plays a script, then repeats `fallback`.
pub struct ScriptedPressure {
    pub script: VecDeque<Result<f32, SensorError>>,
    pub fallback: f32,
}

impl ScriptedPressure {
    pub fn constant(value: f32) -> Self {
        Self {
            script: VecDeque::new(),
            fallback: value,
        }
    }

    pub fn push(&mut self, reading: Result<f32, SensorError>) {
        self.script.push_back(reading);
    }
}

impl PressureSource for ScriptedPressure {
    fn read_pressure(&mut self) -> Result<f32, SensorError> {
        self.script.pop_front().unwrap_or(Ok(self.fallback))
    }
}

// ── LogSink ──────────────────────────────────────────────────

/// Event sink that keeps every event for inspection.
pub struct LogSink {
    pub events: Vec<AppEvent>,
}

impl LogSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for LogSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig ──────────────────────────────────────────────────────

/// Collaborators the surrounding system owns and lends to the controller.
pub struct Rig {
    pub blower_valve: MockValve,
    pub patient_valve: MockValve,
    pub alarms: AlarmController,
    pub blower: MockBlower,
}

impl Rig {
    pub fn new() -> Self {
        Self {
            blower_valve: MockValve::new(),
            patient_valve: MockValve::new(),
            alarms: AlarmController::new(),
            blower: MockBlower::new(),
        }
    }

    pub fn controller(
        &mut self,
        config: &SystemConfig,
    ) -> PressureController<'_, MockValve, MockBlower> {
        PressureController::new(
            config,
            &mut self.blower_valve,
            &mut self.patient_valve,
            &mut self.alarms,
            &mut self.blower,
        )
        .expect("valid config")
    }

    pub fn service(
        &mut self,
        config: &SystemConfig,
    ) -> VentilatorService<'_, MockValve, MockBlower> {
        let controller = self.controller(config);
        VentilatorService::new(controller, config)
    }
}

/// Settings used by the clinical scenarios: 15 cpm, PEEP 5, plateau 30,
/// peak 40 cmH2O.
pub fn scenario_config() -> SystemConfig {
    let mut c = SystemConfig::default();
    c.ventilation.cycles_per_minute = 15;
    c.ventilation.min_peep_command = 5.0;
    c.ventilation.max_plateau_pressure = 30.0;
    c.ventilation.max_peak_pressure = 40.0;
    c
}

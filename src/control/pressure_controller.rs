//! Closed-loop pressure controller.
//!
//! Owns the cycle state machine, both PID loops, the pressure history and
//! the per-cycle statistics.  Borrows the two valves, the blower and the
//! alarm controller from the surrounding system for its whole lifetime.
//!
//! One call to [`PressureController::tick`] per control period:
//!
//! ```text
//!   sample ─▶ history ─▶ stats / per-tick alarms ─▶ state machine
//!                                                      │
//!            boundary latches (plateau, peak, PEEP) ◀──┘
//!                                                      │
//!   valves ◀── angle_for_opening ◀── PID blower / PID patient
//!   blower ◀── speed (ramped once per cycle)
//! ```

use log::{info, warn};

use crate::alarms::{AlarmCode, AlarmController, AlarmSet};
use crate::app::ports::{BlowerActuator, ValveActuator};
use crate::config::{BlowerSettings, SystemConfig, VentilationSettings};
use crate::control::history::PressureHistory;
use crate::control::pid::{Action, PidController};
use crate::cycle::{
    CycleDurations, CyclePhase, CycleState, CycleStateMachine, CycleSubPhase, Transition,
};
use crate::error::Result;

/// Below this a sample counts as a disconnected circuit (cmH2O).
pub const PRESSURE_TOO_LOW_CMH2O: f32 = 2.0;
/// Below this a latched plateau counts as no pressure build-up (cmH2O).
pub const PLATEAU_TOO_LOW_CMH2O: f32 = 2.0;
/// Samples averaged by [`PressureController::smoothed_pressure`].
pub const SMOOTHING_WINDOW: usize = 4;

/// Statistics of one completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CycleStats {
    pub cycle: u32,
    pub peak_pressure: f32,
    pub plateau_pressure: f32,
    pub peep: f32,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub transition: Option<Transition>,
    pub state: CycleState,
    pub blower_valve_angle: u16,
    pub patient_valve_angle: u16,
    pub blower_speed: u16,
    pub active_alarms: AlarmSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ramp {
    Hold,
    Up,
    Down,
}

pub struct PressureController<'a, V, B> {
    settings: VentilationSettings,
    blower_settings: BlowerSettings,
    peep_margin: f32,

    cycle: CycleStateMachine,
    history: PressureHistory,
    pressure: f32,
    rejected_samples: u32,

    // ── Running statistics ──
    peak_pressure: f32,
    cycle_peak: f32,
    plateau_pressure: f32,
    peep: f32,
    hold_sample: Option<f32>,
    exhale_sample: Option<f32>,
    last_cycle: Option<CycleStats>,

    pid_blower: PidController,
    pid_patient: PidController,

    blower_speed: u16,
    blower_saturated: bool,

    blower_valve: &'a mut V,
    patient_valve: &'a mut V,
    alarms: &'a mut AlarmController,
    blower: &'a mut B,
}

impl<'a, V: ValveActuator, B: BlowerActuator> PressureController<'a, V, B> {
    /// Build a controller.  Fails if the configuration is invalid; nothing
    /// is commanded until [`setup`](Self::setup) or the first tick.
    pub fn new(
        config: &SystemConfig,
        blower_valve: &'a mut V,
        patient_valve: &'a mut V,
        alarms: &'a mut AlarmController,
        blower: &'a mut B,
    ) -> Result<Self> {
        config.validate()?;

        let settings = config.ventilation;
        let durations = CycleDurations::new(settings.cycles_per_minute, &config.timing);

        let mut pid_blower = PidController::new(&config.blower_pid, Action::Direct);
        pid_blower.set_limits(0.0, f32::from(blower_valve.span()));
        let mut pid_patient = PidController::new(&config.patient_pid, Action::Reverse);
        pid_patient.set_limits(0.0, f32::from(patient_valve.span()));

        info!(
            "controller: {} cpm, PEEP {:.1} / plateau {:.1} / peak {:.1} cmH2O, cycle {} us",
            settings.cycles_per_minute,
            settings.min_peep_command,
            settings.max_plateau_pressure,
            settings.max_peak_pressure,
            durations.cycle_us
        );

        Ok(Self {
            settings,
            blower_settings: config.blower,
            peep_margin: config.peep_margin_cmh2o,
            cycle: CycleStateMachine::new(durations),
            history: PressureHistory::new(),
            pressure: 0.0,
            rejected_samples: 0,
            peak_pressure: 0.0,
            cycle_peak: 0.0,
            plateau_pressure: 0.0,
            peep: 0.0,
            hold_sample: None,
            exhale_sample: None,
            last_cycle: None,
            pid_blower,
            pid_patient,
            blower_speed: config.blower.initial_speed,
            blower_saturated: false,
            blower_valve,
            patient_valve,
            alarms,
            blower,
        })
    }

    /// Put the actuators in their cycle-start position.
    pub fn setup(&mut self) {
        self.blower_valve.close();
        self.patient_valve.close();
        self.blower.set_speed(self.blower_speed);
    }

    /// Stop the blower and vent the patient circuit.
    pub fn safe_stop(&mut self) {
        self.blower.stop();
        self.blower_valve.close();
        self.patient_valve.open();
        warn!("controller: stopped, patient valve vented");
    }

    /// Start a fresh cycle after a stop.  Statistics and alarms are reset;
    /// the blower speed learned so far is kept.
    pub fn restart(&mut self) {
        self.cycle.restart();
        self.history.clear();
        self.reset_cycle_stats();
        self.plateau_pressure = 0.0;
        self.peep = 0.0;
        self.pid_blower.reset();
        self.pid_patient.reset();
        self.alarms.reset();
        self.setup();
    }

    /// Run one control period with `sample` (cmH2O) taken `dt_us` after
    /// the previous one.
    pub fn tick(&mut self, sample: f32, dt_us: u32) -> TickOutcome {
        let sample = if sample.is_finite() {
            sample
        } else {
            self.rejected_samples = self.rejected_samples.saturating_add(1);
            warn!("controller: non-finite pressure sample, reusing {:.1}", self.pressure);
            self.pressure
        };
        self.pressure = sample;
        self.history.push(sample);

        // Attribute the sample to the sub-phase it was taken in.
        self.peak_pressure = self.peak_pressure.max(sample);
        match self.cycle.state().sub_phase() {
            CycleSubPhase::HoldInspiration => self.hold_sample = Some(sample),
            CycleSubPhase::Exhale => self.exhale_sample = Some(sample),
            CycleSubPhase::Inspiration => {}
        }

        let cycle = self.cycle.cycle_number();
        if sample > self.settings.max_peak_pressure {
            self.alarms.raise(AlarmCode::PeakPressureHigh, cycle);
        }
        if sample < PRESSURE_TOO_LOW_CMH2O {
            self.alarms.raise(AlarmCode::PressureTooLow, cycle);
        }

        let transition = self.cycle.advance(dt_us);
        match transition {
            Some(Transition::HoldToExhale) => self.end_inhalation(),
            Some(Transition::ExhaleToInspiration) => self.end_cycle(),
            Some(Transition::InspirationToHold) | None => {}
        }

        self.regulate(dt_us);

        TickOutcome {
            transition,
            state: self.cycle.state(),
            blower_valve_angle: self.blower_valve.aperture(),
            patient_valve_angle: self.patient_valve.aperture(),
            blower_speed: self.blower.speed(),
            active_alarms: self.alarms.active(),
        }
    }

    /// HOLD_INSPIRATION → EXHALE: latch plateau and the cycle peak.
    fn end_inhalation(&mut self) {
        let cycle = self.cycle.cycle_number();
        self.plateau_pressure = self.hold_sample.unwrap_or(self.pressure);
        self.cycle_peak = self.peak_pressure;

        if self.plateau_pressure > self.settings.max_plateau_pressure {
            self.alarms.raise(AlarmCode::PlateauPressureHigh, cycle);
        }
        if self.plateau_pressure < PLATEAU_TOO_LOW_CMH2O {
            self.alarms.raise(AlarmCode::PlateauTooLow, cycle);
        }
    }

    /// EXHALE → INSPIRATION: latch PEEP, close the finished cycle's alarm
    /// evaluation, ramp the blower, and reset per-cycle state.
    fn end_cycle(&mut self) {
        let finished = self.cycle.cycle_number().wrapping_sub(1);
        self.peep = self.exhale_sample.unwrap_or(self.pressure);

        self.alarms.snapshot_previous_cycle();
        if self.peep < self.settings.min_peep_command {
            self.alarms.raise(AlarmCode::PeepTooLow, finished);
        }
        self.alarms.end_cycle(finished);

        let stats = CycleStats {
            cycle: finished,
            peak_pressure: self.cycle_peak,
            plateau_pressure: self.plateau_pressure,
            peep: self.peep,
        };
        self.last_cycle = Some(stats);

        let ramp = if stats.peak_pressure > self.settings.max_peak_pressure {
            Ramp::Down
        } else if self.blower_saturated && stats.peak_pressure < self.settings.max_plateau_pressure {
            Ramp::Up
        } else {
            Ramp::Hold
        };
        self.apply_ramp(ramp);

        info!(
            "cycle {}: peak {:.1} plateau {:.1} PEEP {:.1} cmH2O, blower {}, alarms {:?}",
            finished,
            stats.peak_pressure,
            stats.plateau_pressure,
            stats.peep,
            self.blower_speed,
            self.alarms.active().codes()
        );

        self.reset_cycle_stats();
        self.pid_blower.reset();
        self.pid_patient.reset();
    }

    fn apply_ramp(&mut self, ramp: Ramp) {
        let bs = &self.blower_settings;
        self.blower_speed = match ramp {
            Ramp::Hold => self.blower_speed,
            Ramp::Up => self.blower_speed.saturating_add(bs.ramp_step),
            Ramp::Down => self.blower_speed.saturating_sub(bs.ramp_step),
        }
        .clamp(bs.min_speed, bs.max_speed);
    }

    fn reset_cycle_stats(&mut self) {
        self.peak_pressure = 0.0;
        self.cycle_peak = 0.0;
        self.hold_sample = None;
        self.exhale_sample = None;
        self.blower_saturated = false;
    }

    /// Run both PID loops for the current sub-phase and push the commands.
    fn regulate(&mut self, dt_us: u32) {
        let s = &self.settings;
        let (blower_target, patient_target) = match self.cycle.state().phase() {
            CyclePhase::Inhalation => (s.max_plateau_pressure, s.max_peak_pressure),
            CyclePhase::Exhalation => (s.min_peep_command, s.min_peep_command + self.peep_margin),
        };
        self.pid_blower.set_target(blower_target);
        self.pid_patient.set_target(patient_target);

        let dt_s = dt_us as f32 / 1_000_000.0;
        let previous = self.history.previous();
        let blower_opening = self.pid_blower.compute(self.pressure, previous, dt_s);
        let patient_opening = self.pid_patient.compute(self.pressure, previous, dt_s);

        if self.cycle.state().sub_phase() == CycleSubPhase::Inspiration
            && self.pid_blower.is_saturated_high()
        {
            self.blower_saturated = true;
        }

        let blower_angle = self.blower_valve.angle_for_opening(blower_opening);
        let patient_angle = self.patient_valve.angle_for_opening(patient_opening);
        self.blower_valve.set_aperture(blower_angle);
        self.patient_valve.set_aperture(patient_angle);
        self.blower.set_speed(self.blower_speed);
    }

    /// Clear one alarm immediately (operator acknowledgement).
    pub fn clear_alarm(&mut self, code: AlarmCode) {
        self.alarms.clear(code);
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn state(&self) -> CycleState {
        self.cycle.state()
    }

    pub fn phase(&self) -> CyclePhase {
        self.cycle.state().phase()
    }

    pub fn sub_phase(&self) -> CycleSubPhase {
        self.cycle.state().sub_phase()
    }

    /// Most recent accepted sample (cmH2O).
    pub fn pressure(&self) -> f32 {
        self.pressure
    }

    /// Mean of the last few samples.
    pub fn smoothed_pressure(&self) -> f32 {
        self.history.average(SMOOTHING_WINDOW).unwrap_or(self.pressure)
    }

    pub fn history(&self) -> &PressureHistory {
        &self.history
    }

    /// Highest sample since the current cycle started.
    pub fn peak_pressure(&self) -> f32 {
        self.peak_pressure
    }

    /// Plateau latched at the last hold end, 0 before the first hold.
    pub fn plateau_pressure(&self) -> f32 {
        self.plateau_pressure
    }

    /// PEEP latched at the last cycle end, 0 before the first cycle ends.
    pub fn peep(&self) -> f32 {
        self.peep
    }

    pub fn pid_blower(&self) -> &PidController {
        &self.pid_blower
    }

    pub fn pid_patient(&self) -> &PidController {
        &self.pid_patient
    }

    pub fn blower_valve(&self) -> &V {
        self.blower_valve
    }

    pub fn patient_valve(&self) -> &V {
        self.patient_valve
    }

    pub fn blower(&self) -> &B {
        self.blower
    }

    /// Speed the blower is commanded to this cycle.
    pub fn blower_speed(&self) -> u16 {
        self.blower_speed
    }

    pub fn alarms(&self) -> &AlarmController {
        self.alarms
    }

    pub fn cycle_number(&self) -> u32 {
        self.cycle.cycle_number()
    }

    pub fn last_cycle(&self) -> Option<CycleStats> {
        self.last_cycle
    }

    pub fn settings(&self) -> &VentilationSettings {
        &self.settings
    }

    pub fn durations(&self) -> &CycleDurations {
        self.cycle.durations()
    }

    /// Non-finite samples replaced by the previous one.
    pub fn rejected_samples(&self) -> u32 {
        self.rejected_samples
    }
}

//! Clinical scenarios driven straight through the `PressureController`.
//!
//! Every test runs at the 10 ms control period against the mock valves and
//! blower from `mock_hw`.

use respirator::alarms::AlarmCode;
use respirator::control::PressureController;
use respirator::cycle::{CyclePhase, CycleSubPhase, Transition};
use respirator::error::{ConfigError, Error};

use crate::mock_hw::{MockBlower, MockValve, Rig, scenario_config};

const DT: u32 = 10_000;

type Controller<'a> = PressureController<'a, MockValve, MockBlower>;

/// Run one full cycle, feeding a constant sample per sub-phase.
fn run_cycle(c: &mut Controller<'_>, inspiration: f32, hold: f32, exhale: f32) {
    for _ in 0..10_000 {
        let sample = match c.sub_phase() {
            CycleSubPhase::Inspiration => inspiration,
            CycleSubPhase::HoldInspiration => hold,
            CycleSubPhase::Exhale => exhale,
        };
        if c.tick(sample, DT).transition == Some(Transition::ExhaleToInspiration) {
            return;
        }
    }
    panic!("cycle never completed");
}

// ── Peak pressure ────────────────────────────────────────────

#[test]
fn rising_trace_raises_peak_alarm_before_hold() {
    let mut rig = Rig::new();
    let mut c = rig.controller(&scenario_config());

    // Ramp 0 → 42 cmH2O over the 107 inspiration ticks.
    let mut fired = None;
    for n in 0..107u32 {
        let sample = 42.0 * (n.min(106) as f32) / 106.0;
        fired = c.tick(sample, DT).transition;
    }

    assert_eq!(fired, Some(Transition::InspirationToHold));
    assert_eq!(c.sub_phase(), CycleSubPhase::HoldInspiration);
    assert!(c.alarms().is_active(AlarmCode::PeakPressureHigh));
    assert!(c.peak_pressure() >= 42.0);
}

#[test]
fn peak_alarm_clears_after_clean_cycle() {
    let mut rig = Rig::new();
    let mut c = rig.controller(&scenario_config());

    for _ in 0..10 {
        c.tick(20.0, DT);
    }
    c.tick(45.0, DT);
    run_cycle(&mut c, 20.0, 20.0, 6.0);
    assert!(c.alarms().is_active(AlarmCode::PeakPressureHigh));
    assert_eq!(c.last_cycle().map(|s| s.peak_pressure), Some(45.0));

    run_cycle(&mut c, 20.0, 20.0, 6.0);
    assert!(!c.alarms().is_active(AlarmCode::PeakPressureHigh));
    assert!(c.alarms().active().is_empty());
}

// ── PEEP ─────────────────────────────────────────────────────

#[test]
fn low_end_of_exhale_raises_peep_alarm() {
    let mut rig = Rig::new();
    let mut c = rig.controller(&scenario_config());

    run_cycle(&mut c, 25.0, 25.0, 3.0);

    assert_eq!(c.peep(), 3.0);
    assert!(c.alarms().is_active(AlarmCode::PeepTooLow));
    assert_eq!(c.alarms().raised_at_cycle(AlarmCode::PeepTooLow), Some(1));
    assert_eq!(c.phase(), CyclePhase::Inhalation);
    assert_eq!(c.cycle_number(), 2);
}

#[test]
fn peep_is_last_exhale_sample() {
    let mut rig = Rig::new();
    let mut c = rig.controller(&scenario_config());

    while c.tick(25.0, DT).transition != Some(Transition::HoldToExhale) {}

    // 266 exhale ticks at 15 cpm; only the final one sets PEEP.
    for _ in 0..265 {
        assert_eq!(c.tick(9.0, DT).transition, None);
    }
    let out = c.tick(7.0, DT);
    assert_eq!(out.transition, Some(Transition::ExhaleToInspiration));
    assert_eq!(c.peep(), 7.0);
    assert!(!c.alarms().is_active(AlarmCode::PeepTooLow));
}

// ── Previous-cycle bookkeeping ───────────────────────────────

#[test]
fn previous_cycle_alarms_lag_by_one_cycle() {
    let mut rig = Rig::new();
    let mut c = rig.controller(&scenario_config());

    run_cycle(&mut c, 25.0, 25.0, 3.0);
    assert!(c.alarms().previous_cycle_alarms().is_empty());
    assert!(c.alarms().newly_raised().contains(AlarmCode::PeepTooLow));

    run_cycle(&mut c, 25.0, 25.0, 6.0);
    assert!(c.alarms().previous_cycle_alarms().contains(AlarmCode::PeepTooLow));
    assert!(!c.alarms().is_active(AlarmCode::PeepTooLow));
    assert!(c.alarms().cleared_since_previous().contains(AlarmCode::PeepTooLow));

    run_cycle(&mut c, 25.0, 25.0, 6.0);
    assert!(c.alarms().previous_cycle_alarms().is_empty());
}

// ── Plateau ──────────────────────────────────────────────────

#[test]
fn plateau_above_limit_raises_alarm_at_hold_end() {
    let mut rig = Rig::new();
    let mut c = rig.controller(&scenario_config());

    run_cycle(&mut c, 33.0, 33.0, 6.0);
    assert_eq!(c.plateau_pressure(), 33.0);
    assert!(c.alarms().is_active(AlarmCode::PlateauPressureHigh));
    assert!(!c.alarms().is_active(AlarmCode::PeakPressureHigh));
}

#[test]
fn disconnected_circuit_needs_four_cycles() {
    let mut rig = Rig::new();
    let mut c = rig.controller(&scenario_config());

    for _ in 0..3 {
        run_cycle(&mut c, 0.5, 0.5, 0.5);
        assert!(!c.alarms().is_active(AlarmCode::PressureTooLow));
    }
    // The plateau-too-low alarm needs only two cycles.
    assert!(c.alarms().is_active(AlarmCode::PlateauTooLow));

    c.tick(0.5, DT);
    assert!(c.alarms().is_active(AlarmCode::PressureTooLow));
}

// ── Actuation ────────────────────────────────────────────────

#[test]
fn every_tick_commands_all_actuators_within_range() {
    let mut rig = Rig::new();
    {
        let mut c = rig.controller(&scenario_config());
        c.setup();
        run_cycle(&mut c, 35.0, 28.0, 4.0);
        run_cycle(&mut c, 10.0, 10.0, 10.0);
    }
    // setup + 800 ticks
    assert_eq!(rig.blower_valve.calls.len(), 801);
    assert_eq!(rig.patient_valve.calls.len(), 801);
    assert!(
        rig.blower_valve
            .calls
            .iter()
            .chain(&rig.patient_valve.calls)
            .all(|a| (25..=145).contains(a))
    );
    assert_eq!(rig.blower.calls.len(), 801);
}

#[test]
fn stalled_control_loop_resumes_single_cycle() {
    let mut rig = Rig::new();
    let mut c = rig.controller(&scenario_config());

    for _ in 0..10 {
        c.tick(20.0, DT);
    }
    assert_eq!(c.tick(20.0, 40_000_000).transition, Some(Transition::InspirationToHold));

    let mut transitions = Vec::new();
    for _ in 0..30 {
        if let Some(t) = c.tick(20.0, DT).transition {
            transitions.push(t);
        }
    }
    assert_eq!(
        transitions,
        vec![Transition::HoldToExhale, Transition::ExhaleToInspiration]
    );
    assert_eq!(c.cycle_number(), 2);
    assert_eq!(c.sub_phase(), CycleSubPhase::Inspiration);
}

// ── Construction ─────────────────────────────────────────────

#[test]
fn invalid_configurations_fail_fast() {
    let mut bad = Vec::new();

    let mut c = scenario_config();
    c.ventilation.min_peep_command = 30.0;
    bad.push((c, ConfigError::PressureBoundsOrder));

    let mut c = scenario_config();
    c.ventilation.max_peak_pressure = 30.0;
    bad.push((c, ConfigError::PressureBoundsOrder));

    let mut c = scenario_config();
    c.ventilation.cycles_per_minute = 0;
    bad.push((c, ConfigError::CyclesPerMinuteOutOfRange(0)));

    let mut c = scenario_config();
    c.control_period_us = 0;
    bad.push((c, ConfigError::ControlPeriod));

    for (config, expected) in bad {
        let mut rig = Rig::new();
        let result = PressureController::new(
            &config,
            &mut rig.blower_valve,
            &mut rig.patient_valve,
            &mut rig.alarms,
            &mut rig.blower,
        );
        assert!(matches!(result, Err(Error::Config(e)) if e == expected));
    }
}

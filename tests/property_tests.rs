//! Property tests for the pressure controller.
//!
//! Runs on host (x86_64) only — proptest is not available for ESP32 targets.
//! On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

#[path = "integration/mock_hw.rs"]
mod mock_hw;

use mock_hw::Rig;
use proptest::prelude::*;
use respirator::config::SystemConfig;
use respirator::control::PressureController;
use respirator::cycle::Transition;
use respirator::error::{ConfigError, Error};

fn config(cpm: u16, peep: f32, plateau: f32, peak: f32) -> SystemConfig {
    let mut c = SystemConfig::default();
    c.ventilation.cycles_per_minute = cpm;
    c.ventilation.min_peep_command = peep;
    c.ventilation.max_plateau_pressure = plateau;
    c.ventilation.max_peak_pressure = peak;
    c
}

/// Samples a sensor might produce, including garbage.
fn sample() -> impl Strategy<Value = f32> {
    prop_oneof![
        8 => -10.0f32..90.0,
        1 => Just(f32::NAN),
        1 => Just(f32::INFINITY),
    ]
}

// ── Construction ─────────────────────────────────────────────

proptest! {
    #[test]
    fn ordered_bounds_always_construct(
        cpm in 5u16..=35,
        peep in 0.5f32..20.0,
        d_plateau in 0.5f32..20.0,
        d_peak in 0.5f32..20.0,
    ) {
        let cfg = config(cpm, peep, peep + d_plateau, peep + d_plateau + d_peak);
        let mut rig = Rig::new();
        let r = PressureController::new(
            &cfg,
            &mut rig.blower_valve,
            &mut rig.patient_valve,
            &mut rig.alarms,
            &mut rig.blower,
        );
        prop_assert!(r.is_ok());
    }

    #[test]
    fn unordered_bounds_never_construct(
        plateau in 1.0f32..50.0,
        above in 0.0f32..10.0,
    ) {
        let cfg = config(20, plateau + above, plateau, 65.0);
        let mut rig = Rig::new();
        let r = PressureController::new(
            &cfg,
            &mut rig.blower_valve,
            &mut rig.patient_valve,
            &mut rig.alarms,
            &mut rig.blower,
        );
        prop_assert!(matches!(r, Err(Error::Config(ConfigError::PressureBoundsOrder))));
    }

    #[test]
    fn rate_outside_device_range_never_constructs(
        cpm in prop_oneof![0u16..5, 36u16..=u16::MAX],
    ) {
        let cfg = config(cpm, 5.0, 30.0, 40.0);
        let mut rig = Rig::new();
        let r = PressureController::new(
            &cfg,
            &mut rig.blower_valve,
            &mut rig.patient_valve,
            &mut rig.alarms,
            &mut rig.blower,
        );
        prop_assert!(matches!(
            r,
            Err(Error::Config(ConfigError::CyclesPerMinuteOutOfRange(_)))
        ));
    }
}

// ── Running controller ───────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Sub-phases follow Inspiration → Hold → Exhale → Inspiration, one
    /// step per tick at most, whatever the samples and tick length.
    #[test]
    fn phase_sequence_never_skips(
        cpm in 5u16..=35,
        dt_us in 1_000u32..=50_000,
        samples in proptest::collection::vec(sample(), 1..2_000),
    ) {
        let cfg = config(cpm, 5.0, 30.0, 40.0);
        let mut rig = Rig::new();
        let mut c = rig.controller(&cfg);

        for s in samples {
            let before = c.state();
            let out = c.tick(s, dt_us);
            match out.transition {
                Some(t) => {
                    prop_assert_eq!(t.from_state(), before);
                    prop_assert_eq!(t.to_state(), out.state);
                }
                None => {
                    prop_assert_eq!(before, out.state);
                }
            }
        }
    }

    /// The running peak covers every accepted sample since the last
    /// cycle start, and every command stays inside its actuator range.
    #[test]
    fn peak_and_commands_stay_bounded(
        dt_us in 5_000u32..=20_000,
        samples in proptest::collection::vec(sample(), 1..2_000),
    ) {
        let cfg = config(30, 5.0, 30.0, 40.0);
        let mut rig = Rig::new();
        let mut c = rig.controller(&cfg);
        let mut since_cycle_start: Vec<f32> = Vec::new();

        for s in samples {
            let out = c.tick(s, dt_us);
            since_cycle_start.push(c.pressure());
            if out.transition == Some(Transition::ExhaleToInspiration) {
                since_cycle_start.clear();
            }

            for p in &since_cycle_start {
                prop_assert!(c.peak_pressure() >= *p);
            }
            prop_assert!((25..=145).contains(&out.blower_valve_angle));
            prop_assert!((25..=145).contains(&out.patient_valve_angle));
            prop_assert!((95..=180).contains(&out.blower_speed));

            let (lo, hi) = c.pid_blower().limits();
            prop_assert!((lo..=hi).contains(&c.pid_blower().last_output()));
            let (lo, hi) = c.pid_patient().limits();
            prop_assert!((lo..=hi).contains(&c.pid_patient().last_output()));
        }
    }
}

//! Fuzz target: `PressureSensor` → `PressureController::tick`
//!
//! Treats the input as a stream of little-endian raw ADC words (plus a
//! tick-length byte per sample), runs them through the sensor filter and
//! the controller, and asserts that:
//! - nothing panics
//! - valve angles stay inside the calibration
//! - the blower command stays inside its speed range
//! - sub-phases advance one step at a time
//!
//! cargo fuzz run fuzz_pressure_trace

#![no_main]

use libfuzzer_sys::fuzz_target;
use respirator::alarms::AlarmController;
use respirator::app::ports::{BlowerActuator, ValveActuator};
use respirator::config::SystemConfig;
use respirator::control::PressureController;
use respirator::sensors::pressure::PressureSensor;

struct Valve(u16);

impl ValveActuator for Valve {
    fn set_aperture(&mut self, angle: u16) {
        self.0 = angle.clamp(25, 145);
    }
    fn aperture(&self) -> u16 {
        self.0
    }
    fn open_angle(&self) -> u16 {
        25
    }
    fn close_angle(&self) -> u16 {
        145
    }
}

struct Fan(u16);

impl BlowerActuator for Fan {
    fn set_speed(&mut self, command: u16) {
        self.0 = command;
    }
    fn speed(&self) -> u16 {
        self.0
    }
    fn stop(&mut self) {
        self.0 = 0;
    }
}

fuzz_target!(|data: &[u8]| {
    let Some((&cpm, data)) = data.split_first() else {
        return;
    };
    let mut config = SystemConfig::default();
    config.ventilation.cycles_per_minute = 5 + u16::from(cpm % 31);

    let (mut bv, mut pv, mut fan) = (Valve(145), Valve(145), Fan(0));
    let mut alarms = AlarmController::new();
    let Ok(mut controller) =
        PressureController::new(&config, &mut bv, &mut pv, &mut alarms, &mut fan)
    else {
        return;
    };
    let mut sensor = PressureSensor::new(config.pressure_sensor);

    for chunk in data.chunks_exact(3) {
        let raw = u16::from_le_bytes([chunk[0], chunk[1]]);
        let dt_us = 1_000 + u32::from(chunk[2]) * 200;
        let before = controller.state();
        let out = controller.tick(sensor.convert(raw), dt_us);

        assert!((25..=145).contains(&out.blower_valve_angle));
        assert!((25..=145).contains(&out.patient_valve_angle));
        assert!((config.blower.min_speed..=config.blower.max_speed).contains(&out.blower_speed));
        if let Some(t) = out.transition {
            assert_eq!(t.from_state(), before);
        }
    }
});

//! Airway pressure transducer driver.
//!
//! The transducer is an analog gauge sensor on an ADC1 channel.  Raw
//! counts pass through an integer first-order filter and a linear
//! calibration to mmH2O, reported in cmH2O.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: the control timer callback samples the ADC and latches the
//! raw reading into a static `AtomicU16`.  On host/test: the same atomic is
//! written by `latch_raw_sample()` (or `hw_timer::sim_tick`).

use core::sync::atomic::{AtomicU16, Ordering};

use crate::app::ports::PressureSource;
use crate::config::PressureCalibration;
use crate::error::SensorError;

static LATCHED_RAW: AtomicU16 = AtomicU16::new(0);

/// Store the newest raw ADC sample.  Safe from timer or ISR context.
pub fn latch_raw_sample(raw: u16) {
    LATCHED_RAW.store(raw, Ordering::Relaxed);
}

/// Most recent latched raw ADC sample.
pub fn latched_raw() -> u16 {
    LATCHED_RAW.load(Ordering::Relaxed)
}

pub struct PressureSensor {
    cal: PressureCalibration,
    filtered_raw: i32,
    total_reads: u32,
}

impl PressureSensor {
    pub fn new(cal: PressureCalibration) -> Self {
        Self {
            cal,
            filtered_raw: 0,
            total_reads: 0,
        }
    }

    /// Feed one raw sample through the filter and return cmH2O.
    pub fn convert(&mut self, raw: u16) -> f32 {
        self.total_reads = self.total_reads.saturating_add(1);

        let divider = self.cal.filter_divider.max(1);
        let mut delta = i32::from(raw) - self.filtered_raw;
        // Round away from zero so the filter settles on the input exactly.
        delta += if delta > 0 { divider - 1 } else { -(divider - 1) };
        self.filtered_raw += delta / divider;

        let scaled = i64::from(self.filtered_raw) * i64::from(self.cal.scale_num)
            / i64::from(self.cal.scale_den.max(1));
        let mmh2o = (scaled - i64::from(self.cal.offset_mmh2o)).max(0);
        mmh2o as f32 / 10.0
    }

    /// Filtered raw counts.
    pub fn filtered_raw(&self) -> i32 {
        self.filtered_raw
    }

    pub fn total_reads(&self) -> u32 {
        self.total_reads
    }

    /// Drop filter state, e.g. after a ventilation restart.
    pub fn reset(&mut self) {
        self.filtered_raw = 0;
        self.total_reads = 0;
    }
}

impl PressureSource for PressureSensor {
    fn read_pressure(&mut self) -> Result<f32, SensorError> {
        let cmh2o = self.convert(latched_raw());
        if cmh2o.is_finite() {
            Ok(cmh2o)
        } else {
            Err(SensorError::NotFinite)
        }
    }
}

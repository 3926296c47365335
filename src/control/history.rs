//! Bounded pressure sample history.
//!
//! Fixed-size ring buffer: once full, each push evicts the oldest sample.
//! Lives inside the controller, so the hot path never allocates.

/// Capacity of the pressure history (samples).
pub const MAX_PRESSURE_SAMPLES: usize = 64;

#[derive(Debug, Clone)]
pub struct PressureHistory {
    ring: [f32; MAX_PRESSURE_SAMPLES],
    /// Index the next sample is written to.
    head: usize,
    count: usize,
}

impl Default for PressureHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl PressureHistory {
    pub const fn new() -> Self {
        Self {
            ring: [0.0; MAX_PRESSURE_SAMPLES],
            head: 0,
            count: 0,
        }
    }

    pub fn push(&mut self, sample: f32) {
        self.ring[self.head] = sample;
        self.head = (self.head + 1) % MAX_PRESSURE_SAMPLES;
        if self.count < MAX_PRESSURE_SAMPLES {
            self.count += 1;
        }
    }

    /// `back = 0` is the newest sample, `back = 1` the one before it.
    pub fn recent(&self, back: usize) -> Option<f32> {
        if back >= self.count {
            return None;
        }
        let idx = (self.head + MAX_PRESSURE_SAMPLES - 1 - back) % MAX_PRESSURE_SAMPLES;
        Some(self.ring[idx])
    }

    pub fn latest(&self) -> Option<f32> {
        self.recent(0)
    }

    pub fn previous(&self) -> Option<f32> {
        self.recent(1)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        (0..self.count).rev().filter_map(|back| self.recent(back))
    }

    /// Mean of the last `window` samples (fewer if the history is shorter).
    pub fn average(&self, window: usize) -> Option<f32> {
        let n = window.min(self.count);
        if n == 0 {
            return None;
        }
        let sum: f32 = (0..n).filter_map(|back| self.recent(back)).sum();
        Some(sum / n as f32)
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.count = 0;
    }
}

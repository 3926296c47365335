//! Alarm controller.
//!
//! The pressure controller reports **detections**; this module turns them
//! into active alarms and keeps the bookkeeping that upstream escalation
//! policy (buzzer, display) needs.  Nothing here halts ventilation.
//!
//! ## Alarm lifecycle
//!
//! 1. A bound violation calls [`AlarmController::raise`].  The code is
//!    marked *detected* for the cycle in progress.
//! 2. Once a code has been detected in `cycles_before_trigger()`
//!    consecutive cycles it becomes **active** (`error!` logged).
//! 3. At the end of each cycle, [`AlarmController::end_cycle`] clears
//!    every active alarm that was not detected during that cycle
//!    (`info!` logged) and resets the detection flags.
//!
//! The controller calls [`AlarmController::snapshot_previous_cycle`] just
//! before evaluating a cycle boundary.  It copies the set that closed the
//! previous cycle into `previous_cycle_alarms`, so that set always lags
//! the active set by exactly one boundary and the newly-raised /
//! persisting / cleared views can be derived from the pair.

use core::fmt;

use log::{error, info};

// ---------------------------------------------------------------------------
// Alarm identity
// ---------------------------------------------------------------------------

/// Alarm priority as shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum AlarmPriority {
    Low = 0,
    Medium = 1,
    High = 2,
}

/// Alarm codes.  The numeric value is the code shown on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AlarmCode {
    /// Pressure below 2 cmH2O: patient circuit disconnected.
    PressureTooLow = 11,
    /// A sample exceeded the configured peak pressure.
    PeakPressureHigh = 12,
    /// End-expiratory pressure below the PEEP command.
    PeepTooLow = 14,
    /// Plateau above the configured maximum.
    PlateauPressureHigh = 17,
    /// Plateau below 2 cmH2O: no effective inspiration.
    PlateauTooLow = 24,
}

/// Number of distinct alarm codes.
pub const ALARM_COUNT: usize = 5;

impl AlarmCode {
    pub const ALL: [Self; ALARM_COUNT] = [
        Self::PressureTooLow,
        Self::PeakPressureHigh,
        Self::PeepTooLow,
        Self::PlateauPressureHigh,
        Self::PlateauTooLow,
    ];

    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    pub const fn priority(self) -> AlarmPriority {
        match self {
            Self::PressureTooLow
            | Self::PeakPressureHigh
            | Self::PeepTooLow
            | Self::PlateauPressureHigh => AlarmPriority::High,
            Self::PlateauTooLow => AlarmPriority::Low,
        }
    }

    /// Consecutive cycles of detection before the alarm becomes active.
    pub const fn cycles_before_trigger(self) -> u8 {
        match self {
            Self::PressureTooLow => 4,
            Self::PlateauTooLow => 2,
            Self::PeakPressureHigh | Self::PeepTooLow | Self::PlateauPressureHigh => 1,
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::PressureTooLow => 0,
            Self::PeakPressureHigh => 1,
            Self::PeepTooLow => 2,
            Self::PlateauPressureHigh => 3,
            Self::PlateauTooLow => 4,
        }
    }

    const fn mask(self) -> u8 {
        1 << self.index()
    }
}

impl fmt::Display for AlarmCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::PressureTooLow => "pressure too low",
            Self::PeakPressureHigh => "peak pressure high",
            Self::PeepTooLow => "PEEP too low",
            Self::PlateauPressureHigh => "plateau pressure high",
            Self::PlateauTooLow => "plateau pressure too low",
        };
        write!(f, "{text} ({})", self.code())
    }
}

// ---------------------------------------------------------------------------
// Alarm set
// ---------------------------------------------------------------------------

/// Bitmask of alarm codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AlarmSet(u8);

impl AlarmSet {
    pub const EMPTY: Self = Self(0);

    pub fn contains(self, code: AlarmCode) -> bool {
        self.0 & code.mask() != 0
    }

    pub fn insert(&mut self, code: AlarmCode) {
        self.0 |= code.mask();
    }

    pub fn remove(&mut self, code: AlarmCode) {
        self.0 &= !code.mask();
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Codes in `self` but not in `other`.
    pub fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    pub fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn iter(self) -> impl Iterator<Item = AlarmCode> {
        AlarmCode::ALL.into_iter().filter(move |c| self.contains(*c))
    }

    /// Numeric codes, for telemetry.
    pub fn codes(self) -> heapless::Vec<u8, ALARM_COUNT> {
        self.iter().map(AlarmCode::code).collect()
    }

    pub fn highest_priority(self) -> Option<AlarmPriority> {
        self.iter().map(AlarmCode::priority).max()
    }
}

impl FromIterator<AlarmCode> for AlarmSet {
    fn from_iter<I: IntoIterator<Item = AlarmCode>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for code in iter {
            set.insert(code);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct Detection {
    /// Detected at least once in the cycle in progress.
    this_cycle: bool,
    /// Consecutive cycles with a detection, including this one.
    consecutive_cycles: u8,
    /// Cycle in which the alarm last became active.
    raised_at_cycle: u32,
}

/// Active/cleared alarm state keyed by [`AlarmCode`].
#[derive(Debug, Clone, Default)]
pub struct AlarmController {
    detections: [Detection; ALARM_COUNT],
    active: AlarmSet,
    /// Set left active by the last completed boundary evaluation.
    cycle_end: AlarmSet,
    previous_cycle: AlarmSet,
}

impl AlarmController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a detection of `code` during cycle `cycle`.
    pub fn raise(&mut self, code: AlarmCode, cycle: u32) {
        let slot = &mut self.detections[code.index()];
        if !slot.this_cycle {
            slot.this_cycle = true;
            slot.consecutive_cycles = slot.consecutive_cycles.saturating_add(1);
        }
        if !self.active.contains(code) && slot.consecutive_cycles >= code.cycles_before_trigger() {
            slot.raised_at_cycle = cycle;
            self.active.insert(code);
            error!("ALARM RAISED: {code} [{:?}] cycle {cycle}", code.priority());
        }
    }

    /// Clear `code` immediately, regardless of detections.
    pub fn clear(&mut self, code: AlarmCode) {
        if self.active.contains(code) {
            info!("ALARM CLEARED: {code}");
        }
        self.active.remove(code);
        self.detections[code.index()] = Detection::default();
    }

    /// Copy the set that closed the previous cycle into
    /// `previous_cycle_alarms`.  Call before evaluating a boundary.
    pub fn snapshot_previous_cycle(&mut self) {
        self.previous_cycle = self.cycle_end;
    }

    /// Close cycle `finished_cycle`: clear alarms it never detected and
    /// start counting detections for the next one.
    pub fn end_cycle(&mut self, finished_cycle: u32) {
        for code in AlarmCode::ALL {
            let slot = &mut self.detections[code.index()];
            if !slot.this_cycle {
                slot.consecutive_cycles = 0;
                if self.active.contains(code) {
                    self.active.remove(code);
                    info!("ALARM CLEARED: {code} after cycle {finished_cycle}");
                }
            }
            slot.this_cycle = false;
        }
        self.cycle_end = self.active;
    }

    /// Forget all alarm state (ventilation restarted).
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_active(&self, code: AlarmCode) -> bool {
        self.active.contains(code)
    }

    pub fn active(&self) -> AlarmSet {
        self.active
    }

    pub fn previous_cycle_alarms(&self) -> AlarmSet {
        self.previous_cycle
    }

    /// Active now, not active when the previous cycle closed.
    pub fn newly_raised(&self) -> AlarmSet {
        self.active.difference(self.previous_cycle)
    }

    /// Active now and when the previous cycle closed.
    pub fn persisting(&self) -> AlarmSet {
        self.active.intersection(self.previous_cycle)
    }

    /// Active when the previous cycle closed, not active now.
    pub fn cleared_since_previous(&self) -> AlarmSet {
        self.previous_cycle.difference(self.active)
    }

    /// Cycle in which `code` last became active.
    pub fn raised_at_cycle(&self, code: AlarmCode) -> Option<u32> {
        self.is_active(code)
            .then_some(self.detections[code.index()].raised_at_cycle)
    }
}

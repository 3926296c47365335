//! Respiratory cycle state machine.
//!
//! ```text
//!        ┌──────────────────── Inhalation ───────────────────┐ ┌─ Exhalation ─┐
//!  t=0 ──▶ Inspiration ──(inspiration_us)──▶ HoldInspiration ──(inhalation_us)──▶ Exhale ──(cycle_us)──┐
//!    ▲                                                                                               │
//!    └───────────────────────────────────── clock -= cycle_us ────────────────────────────────────────┘
//! ```
//!
//! The cycle clock is the sum of tick `dt`s since the cycle started.  Each
//! call to [`CycleStateMachine::advance`] adds one tick and fires **at most
//! one** transition, evaluated in the fixed order above, so a sub-phase is
//! never skipped even when a tick is late.

use log::debug;

use crate::config::CycleTiming;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Sub-phases of the inhalation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Inhalation {
    Inspiration,
    HoldInspiration,
}

/// Sub-phases of the exhalation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exhalation {
    Exhale,
}

/// Position in the respiratory cycle.  A sub-phase can only exist under
/// the phase it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleState {
    Inhalation(Inhalation),
    Exhalation(Exhalation),
}

/// Flat top-level phase, for telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CyclePhase {
    Inhalation = 0,
    Exhalation = 1,
}

/// Flat sub-phase, for telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CycleSubPhase {
    Inspiration = 0,
    HoldInspiration = 1,
    Exhale = 2,
}

impl CycleState {
    /// State at the start of every cycle.
    pub const START: Self = Self::Inhalation(Inhalation::Inspiration);

    pub fn phase(self) -> CyclePhase {
        match self {
            Self::Inhalation(_) => CyclePhase::Inhalation,
            Self::Exhalation(_) => CyclePhase::Exhalation,
        }
    }

    pub fn sub_phase(self) -> CycleSubPhase {
        match self {
            Self::Inhalation(Inhalation::Inspiration) => CycleSubPhase::Inspiration,
            Self::Inhalation(Inhalation::HoldInspiration) => CycleSubPhase::HoldInspiration,
            Self::Exhalation(Exhalation::Exhale) => CycleSubPhase::Exhale,
        }
    }

    pub fn is_inhalation(self) -> bool {
        matches!(self, Self::Inhalation(_))
    }
}

/// A sub-phase boundary crossed during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    InspirationToHold,
    HoldToExhale,
    /// End of one cycle and start of the next.
    ExhaleToInspiration,
}

impl Transition {
    pub fn from_state(self) -> CycleState {
        match self {
            Self::InspirationToHold => CycleState::Inhalation(Inhalation::Inspiration),
            Self::HoldToExhale => CycleState::Inhalation(Inhalation::HoldInspiration),
            Self::ExhaleToInspiration => CycleState::Exhalation(Exhalation::Exhale),
        }
    }

    pub fn to_state(self) -> CycleState {
        match self {
            Self::InspirationToHold => CycleState::Inhalation(Inhalation::HoldInspiration),
            Self::HoldToExhale => CycleState::Exhalation(Exhalation::Exhale),
            Self::ExhaleToInspiration => CycleState::START,
        }
    }
}

// ---------------------------------------------------------------------------
// Durations
// ---------------------------------------------------------------------------

const MICROS_PER_MINUTE: u64 = 60_000_000;

/// Sub-phase boundaries, as offsets from the cycle start (µs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleDurations {
    /// End of inspiration.
    pub inspiration_us: u64,
    /// End of the inspiratory hold.
    pub inhalation_us: u64,
    /// End of exhalation, i.e. the full cycle.
    pub cycle_us: u64,
}

impl CycleDurations {
    /// Derive boundaries from a validated respiratory rate and timing.
    pub fn new(cycles_per_minute: u16, timing: &CycleTiming) -> Self {
        let cycle_us = MICROS_PER_MINUTE / u64::from(cycles_per_minute.max(1));
        let inhalation_us = scale(cycle_us, timing.inhalation_ratio).clamp(2, cycle_us - 1);
        let inspiration_us = scale(inhalation_us, timing.inspiration_ratio).clamp(1, inhalation_us - 1);
        Self {
            inspiration_us,
            inhalation_us,
            cycle_us,
        }
    }

    pub fn hold_us(&self) -> u64 {
        self.inhalation_us - self.inspiration_us
    }

    pub fn exhale_us(&self) -> u64 {
        self.cycle_us - self.inhalation_us
    }
}

fn scale(duration_us: u64, ratio: f32) -> u64 {
    (duration_us as f64 * f64::from(ratio)).round() as u64
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Tick-driven cycle clock.
#[derive(Debug, Clone)]
pub struct CycleStateMachine {
    durations: CycleDurations,
    state: CycleState,
    elapsed_us: u64,
    cycle_number: u32,
}

impl CycleStateMachine {
    pub fn new(durations: CycleDurations) -> Self {
        Self {
            durations,
            state: CycleState::START,
            elapsed_us: 0,
            cycle_number: 1,
        }
    }

    /// Add one tick of `dt_us` to the cycle clock and fire the transition
    /// it crosses, if any.
    pub fn advance(&mut self, dt_us: u32) -> Option<Transition> {
        self.elapsed_us = self.elapsed_us.saturating_add(u64::from(dt_us));
        let d = &self.durations;

        let transition = match self.state {
            CycleState::Inhalation(Inhalation::Inspiration) if self.elapsed_us >= d.inspiration_us => {
                Transition::InspirationToHold
            }
            CycleState::Inhalation(Inhalation::HoldInspiration) if self.elapsed_us >= d.inhalation_us => {
                Transition::HoldToExhale
            }
            CycleState::Exhalation(Exhalation::Exhale) if self.elapsed_us >= d.cycle_us => {
                // Whole cycles missed during a stall are dropped, not replayed.
                self.elapsed_us %= d.cycle_us;
                self.cycle_number = self.cycle_number.wrapping_add(1);
                Transition::ExhaleToInspiration
            }
            _ => return None,
        };

        debug!(
            "cycle {}: {:?} -> {:?} at {} us",
            self.cycle_number,
            transition.from_state().sub_phase(),
            transition.to_state().sub_phase(),
            self.elapsed_us
        );
        self.state = transition.to_state();
        Some(transition)
    }

    /// Return to the start of a fresh cycle (after a stop/start).
    pub fn restart(&mut self) {
        self.state = CycleState::START;
        self.elapsed_us = 0;
        self.cycle_number = self.cycle_number.wrapping_add(1);
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn durations(&self) -> &CycleDurations {
        &self.durations
    }

    /// Position on the cycle clock (µs since cycle start).
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_us
    }

    /// 1-based number of the cycle in progress.
    pub fn cycle_number(&self) -> u32 {
        self.cycle_number
    }
}

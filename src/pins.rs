//! GPIO / peripheral pin assignments for the respirator main board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Pinch valves (hobby servos on the shared LEDC servo timer)
// ---------------------------------------------------------------------------

/// Servo signal for the blower-side (inspiratory) pinch valve.
pub const BLOWER_VALVE_GPIO: i32 = 4;
/// LEDC channel driving the blower-side valve.
pub const BLOWER_VALVE_CHANNEL: u32 = 0;

/// Servo signal for the patient-side (expiratory) pinch valve.
pub const PATIENT_VALVE_GPIO: i32 = 5;
/// LEDC channel driving the patient-side valve.
pub const PATIENT_VALVE_CHANNEL: u32 = 1;

// ---------------------------------------------------------------------------
// Blower ESC
// ---------------------------------------------------------------------------

/// RC-style ESC signal input of the blower motor controller.
pub const BLOWER_ESC_GPIO: i32 = 6;
/// LEDC channel driving the blower ESC.
pub const BLOWER_ESC_CHANNEL: u32 = 2;

// ---------------------------------------------------------------------------
// Pressure transducer (ADC1)
// ---------------------------------------------------------------------------

/// MPX5010 differential pressure sensor output, ADC1 channel 0.
pub const PRESSURE_ADC_GPIO: i32 = 1;
/// ADC1 channel index of the pressure sensor.
pub const PRESSURE_ADC_CHANNEL: u32 = 0;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer shared by both valves and the ESC.
pub const SERVO_TIMER: u32 = 0;
/// LEDC timer resolution (bits).  14-bit gives ~1.2 µs steps at 50 Hz.
pub const SERVO_RESOLUTION_BITS: u32 = 14;
/// Standard RC servo frame rate (20 ms period).
pub const SERVO_PWM_FREQ_HZ: u32 = 50;

//! Control-period timer using ESP-IDF's esp_timer API.
//!
//! One periodic timer fires every control period.  Its callback samples
//! the pressure ADC, latches the raw reading for [`PressureSensor`], and
//! bumps a pending-tick counter that the main loop drains.  On simulation
//! targets the main loop calls [`sim_tick`] instead.
//!
//! Timer callbacks execute in the ESP timer task context (not ISR), so
//! they may call the oneshot ADC driver.
//!
//! [`PressureSensor`]: crate::sensors::pressure::PressureSensor

use core::sync::atomic::{AtomicU32, Ordering};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

/// Control periods elapsed since the main loop last drained the counter.
static CONTROL_TICKS_PENDING: AtomicU32 = AtomicU32::new(0);

/// Take every pending control tick, resetting the counter.
pub fn take_pending_ticks() -> u32 {
    CONTROL_TICKS_PENDING.swap(0, Ordering::AcqRel)
}

fn on_control_period(raw: Option<u16>) {
    if let Some(raw) = raw {
        crate::sensors::pressure::latch_raw_sample(raw);
    }
    CONTROL_TICKS_PENDING.fetch_add(1, Ordering::AcqRel);
}

/// Drive one control period from a simulated ADC reading.
#[cfg(not(target_os = "espidf"))]
pub fn sim_tick(raw: u16) {
    on_control_period(Some(raw));
}

#[cfg(target_os = "espidf")]
static mut CONTROL_TIMER: esp_timer_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
unsafe extern "C" fn control_tick_cb(_arg: *mut core::ffi::c_void) {
    let raw = crate::drivers::hw_init::adc1_read(crate::pins::PRESSURE_ADC_CHANNEL).ok();
    on_control_period(raw);
}

/// Start the periodic control timer.
#[cfg(target_os = "espidf")]
pub fn start_control_timer(period_us: u32) {
    // SAFETY: CONTROL_TIMER is written here once at boot from the main
    // task before any callback fires.  The callback only touches atomics
    // and the oneshot ADC.
    unsafe {
        let args = esp_timer_create_args_t {
            callback: Some(control_tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"control\0".as_ptr() as *const _,
            skip_unhandled_events: false,
        };
        let ret = esp_timer_create(&args, &raw mut CONTROL_TIMER);
        if ret != ESP_OK {
            log::error!("hw_timer: control timer create failed (rc={})", ret);
            return;
        }
        let ret = esp_timer_start_periodic(CONTROL_TIMER, u64::from(period_us));
        if ret != ESP_OK {
            log::error!("hw_timer: control timer start failed (rc={})", ret);
            return;
        }
        info!("hw_timer: control@{}us started", period_us);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn start_control_timer(period_us: u32) {
    log::info!("hw_timer(sim): control timer not started ({}us driven by sim_tick)", period_us);
}

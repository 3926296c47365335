//! One-shot hardware peripheral initialization.
//!
//! Configures the pressure ADC channel and the LEDC servo timer using raw
//! ESP-IDF sys calls.  Called once from `main()` before the control loop
//! starts.  The LEDC channels handed out here implement
//! [`SetDutyCycle`], which is all the valve and blower drivers need.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use embedded_hal::pwm::{ErrorKind, ErrorType, SetDutyCycle};

#[cfg(target_os = "espidf")]
use log::info;

use crate::error::SensorError;
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    LedcTimerFailed(i32),
    LedcChannelFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::LedcTimerFailed(rc) => write!(f, "LEDC timer config failed (rc={})", rc),
            Self::LedcChannelFailed(rc) => write!(f, "LEDC channel config failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: ADC1_HANDLE is written once in `init_adc()` before the control
/// timer starts; afterwards only the control timer task reads it.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
pub fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    // SAFETY: handle initialised above.
    let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), pins::PRESSURE_ADC_CHANNEL, &chan_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    info!("hw_init: ADC1 configured (CH{}=pressure)", pins::PRESSURE_ADC_CHANNEL);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_adc() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ADC init skipped");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> Result<u16, SensorError> {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract — initialised before the control timer.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return Err(SensorError::AdcReadFailed);
    }
    Ok(raw.max(0) as u16)
}

#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(_channel: u32) -> Result<u16, SensorError> {
    Ok(0)
}

// ── LEDC servo timer ──────────────────────────────────────────

/// The LEDC timer shared by both valve servos and the blower ESC.
pub struct ServoTimer {
    timer_num: u32,
}

impl ServoTimer {
    /// Configure the timer for the 50 Hz servo frame.
    #[cfg(target_os = "espidf")]
    pub fn configure() -> Result<Self, HwInitError> {
        let cfg = ledc_timer_config_t {
            speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            timer_num: pins::SERVO_TIMER,
            duty_resolution: ledc_timer_bit_t_LEDC_TIMER_14_BIT,
            freq_hz: pins::SERVO_PWM_FREQ_HZ,
            clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
            ..Default::default()
        };
        // SAFETY: called once from the main task before any channel exists.
        let ret = unsafe { ledc_timer_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::LedcTimerFailed(ret));
        }
        info!(
            "hw_init: servo timer {} at {} Hz, {} bit",
            pins::SERVO_TIMER,
            pins::SERVO_PWM_FREQ_HZ,
            pins::SERVO_RESOLUTION_BITS
        );
        Ok(Self {
            timer_num: pins::SERVO_TIMER,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn configure() -> Result<Self, HwInitError> {
        log::info!("hw_init(sim): servo timer {} configured", pins::SERVO_TIMER);
        Ok(Self {
            timer_num: pins::SERVO_TIMER,
        })
    }

    pub fn timer_num(&self) -> u32 {
        self.timer_num
    }

    /// Attach `gpio` to LEDC `channel` on this timer, output held low.
    pub fn channel(&self, channel: u32, gpio: i32) -> Result<LedcChannel<'_>, HwInitError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: channel configuration happens once per channel from
            // the main task, after the timer itself was configured.
            let ret = unsafe {
                ledc_channel_config(&ledc_channel_config_t {
                    speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
                    channel,
                    timer_sel: self.timer_num,
                    gpio_num: gpio,
                    duty: 0,
                    hpoint: 0,
                    ..Default::default()
                })
            };
            if ret != ESP_OK as i32 {
                return Err(HwInitError::LedcChannelFailed(ret));
            }
        }
        Ok(LedcChannel {
            _timer: self,
            channel,
            gpio,
            duty: 0,
        })
    }
}

/// LEDC PWM write failure (raw `esp_err_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedcError(pub i32);

impl embedded_hal::pwm::Error for LedcError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// One LEDC channel on the shared [`ServoTimer`].
///
/// ## Dual-target design
///
/// On ESP-IDF: writes the duty register.  On host/test: tracks the duty
/// in memory only.
pub struct LedcChannel<'t> {
    _timer: &'t ServoTimer,
    channel: u32,
    gpio: i32,
    duty: u16,
}

impl LedcChannel<'_> {
    pub fn channel(&self) -> u32 {
        self.channel
    }

    pub fn gpio(&self) -> i32 {
        self.gpio
    }

    /// Last duty written.
    pub fn duty(&self) -> u16 {
        self.duty
    }
}

impl ErrorType for LedcChannel<'_> {
    type Error = LedcError;
}

impl SetDutyCycle for LedcChannel<'_> {
    fn max_duty_cycle(&self) -> u16 {
        ((1u32 << pins::SERVO_RESOLUTION_BITS) - 1) as u16
    }

    #[cfg(target_os = "espidf")]
    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        // SAFETY: the channel was configured in `ServoTimer::channel`; only
        // the control loop writes duty registers.
        unsafe {
            let ret = ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, self.channel, u32::from(duty));
            if ret != ESP_OK as i32 {
                return Err(LedcError(ret));
            }
            let ret = ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, self.channel);
            if ret != ESP_OK as i32 {
                return Err(LedcError(ret));
            }
        }
        self.duty = duty;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.duty = duty;
        Ok(())
    }
}

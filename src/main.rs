//! Respirator Firmware — Main Entry Point
//!
//! Hexagonal architecture driven by a fixed-period control timer.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  PressureSensor     PressureValve ×2   Blower    LogEventSink  │
//! │  (PressureSource)   (ValveActuator)    (Blower-  (EventSink)   │
//! │                                         Actuator)              │
//! │  NvsConfigStore (ConfigStore)                                  │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │           VentilatorService (pure logic)               │    │
//! │  │  PressureController · cycle FSM · PID ×2 · alarms      │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Control timer (esp_timer) · Task watchdog                     │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use respirator::adapters::log_sink::LogEventSink;
use respirator::adapters::nvs::NvsConfigStore;
use respirator::alarms::AlarmController;
use respirator::app::commands::AppCommand;
use respirator::app::ports::ConfigStore;
use respirator::app::service::VentilatorService;
use respirator::config::SystemConfig;
use respirator::control::PressureController;
use respirator::drivers::blower::Blower;
use respirator::drivers::hw_init::{self, ServoTimer};
use respirator::drivers::pressure_valve::PressureValve;
use respirator::drivers::{hw_timer, watchdog::Watchdog};
use respirator::pins;
use respirator::sensors::pressure::PressureSensor;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Respirator v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let config = match NvsConfigStore::new().and_then(|store| store.load()) {
        Ok(c) => c,
        Err(e) => {
            warn!("config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };

    // ── 3. Peripherals ────────────────────────────────────────
    hw_init::init_adc()?;
    let servo_timer = ServoTimer::configure()?;

    let mut blower_valve = PressureValve::new(
        servo_timer.channel(pins::BLOWER_VALVE_CHANNEL, pins::BLOWER_VALVE_GPIO)?,
        pins::BLOWER_VALVE_CHANNEL,
        pins::BLOWER_VALVE_GPIO,
        config.valves,
    );
    let mut patient_valve = PressureValve::new(
        servo_timer.channel(pins::PATIENT_VALVE_CHANNEL, pins::PATIENT_VALVE_GPIO)?,
        pins::PATIENT_VALVE_CHANNEL,
        pins::PATIENT_VALVE_GPIO,
        config.valves,
    );
    let mut blower = Blower::new(
        servo_timer.channel(pins::BLOWER_ESC_CHANNEL, pins::BLOWER_ESC_GPIO)?,
        &config.blower,
    );
    let mut alarms = AlarmController::new();
    let mut sensor = PressureSensor::new(config.pressure_sensor);

    // ── 4. Application core ───────────────────────────────────
    let controller = PressureController::new(
        &config,
        &mut blower_valve,
        &mut patient_valve,
        &mut alarms,
        &mut blower,
    )?;
    let mut service = VentilatorService::new(controller, &config);
    let mut sink = LogEventSink::new();

    let watchdog = Watchdog::new(config.watchdog_timeout_ms);
    hw_timer::start_control_timer(config.control_period_us);
    service.handle_command(AppCommand::Start, &mut sink);

    info!("System ready. Entering control loop.");

    // ── 5. Control loop ───────────────────────────────────────
    loop {
        // Simulate the control timer on non-espidf targets.
        #[cfg(not(target_os = "espidf"))]
        {
            std::thread::sleep(std::time::Duration::from_micros(u64::from(
                config.control_period_us,
            )));
            hw_timer::sim_tick(respirator::sensors::pressure::latched_raw());
        }

        let pending = hw_timer::take_pending_ticks();
        if pending > 1 {
            warn!("control loop overrun: {} periods pending", pending);
        }
        for _ in 0..pending {
            service.tick(&mut sensor, &mut sink);
        }

        // Feed watchdog on every iteration.
        watchdog.feed();

        #[cfg(target_os = "espidf")]
        if pending == 0 {
            esp_idf_svc::hal::delay::FreeRtos::delay_ms(1);
        }
    }
}

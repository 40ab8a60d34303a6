//! Cikon firmware: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  NvsAdapter      OtaAdapter     SystemAdapter   MonotonicClock │
//! │  (ConfigStore)   (OtaPort)      (SystemPort)    (Clock)        │
//! │  DebugAdapter    ButtonAdapter  OnboardLedDriver               │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │          Supervisor (own task, pinned core)            │    │
//! │  │  commands · events · intervals · safe mode             │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use anyhow::Result;
use esp_idf_hal::gpio::{PinDriver, Pull};
use esp_idf_hal::peripherals::Peripherals;
use log::{error, info};

use cikon::adapters::button::ButtonAdapter;
use cikon::adapters::debug::DebugAdapter;
use cikon::adapters::nvs::NvsAdapter;
use cikon::adapters::ota::OtaAdapter;
use cikon::adapters::system::SystemAdapter;
use cikon::adapters::time::MonotonicClock;
use cikon::app::ports::{Clock, ConfigStore, OnboardLed};
use cikon::drivers::onboard_led::OnboardLedDriver;
use cikon::drivers::task_pin::TaskSpec;
use cikon::supervisor::{Platform, SupervisorBuilder};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Cikon v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;

    // ── 2. Config from NVS (or defaults) ──────────────────────
    let nvs = NvsAdapter::new()?;
    let config = nvs.load_or_default();

    // ── 3. Platform ports ─────────────────────────────────────
    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
    let led_pin = PinDriver::output(peripherals.pins.gpio2)?;
    let onboard_led: Arc<dyn OnboardLed> = Arc::new(OnboardLedDriver::new(led_pin, false));

    let platform = Platform {
        clock: Arc::clone(&clock),
        config_store: Box::new(nvs),
        ota: Box::new(OtaAdapter::new()),
        system: Box::new(SystemAdapter::new()),
        onboard_led,
    };

    // ── 4. Adapters ───────────────────────────────────────────
    let mut builder = SupervisorBuilder::new(config.clone(), platform);
    let handle = builder.handle();

    builder.register(DebugAdapter::new(Arc::clone(&clock)))?;

    let mut button_pin = PinDriver::input(peripherals.pins.gpio0)?;
    button_pin.set_pull(Pull::Up)?;
    builder.register(ButtonAdapter::new(button_pin, true, handle, clock))?;

    let mut supervisor = builder.build();
    supervisor.platform_init();

    // ── 5. Supervisor task ────────────────────────────────────
    let worker = TaskSpec::supervisor(&config).spawn(move || {
        supervisor.run();
    })?;

    info!("System ready.");
    if worker.join().is_err() {
        error!("Supervisor task panicked");
    }
    Ok(())
}

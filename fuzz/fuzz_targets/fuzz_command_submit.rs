//! Fuzz target: command submission and the core handlers
//!
//! Splits the input on NUL bytes. The first byte of each chunk selects a
//! registered command, the rest is passed as its argument string. Every
//! chunk is submitted and one loop pass runs after it. Verifies:
//! - No panics for arbitrary argument bytes (setconf JSON, LED words)
//! - The queue never holds more than `QUEUE_LENGTH` jobs
//! - Each pass executes at most one command and leaves no pending events
//!
//! cargo fuzz run fuzz_command_submit

#![no_main]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cikon::adapters::nvs::NvsAdapter;
use cikon::adapters::ota::OtaAdapter;
use cikon::adapters::system::SystemAdapter;
use cikon::adapters::time::MonotonicClock;
use cikon::app::ports::{OnboardLed, OtaImageState};
use cikon::config::{QUEUE_LENGTH, SupervisorConfig};
use cikon::safe_mode::ResetReason;
use cikon::supervisor::{Platform, SupervisorBuilder};
use libfuzzer_sys::fuzz_target;

#[derive(Default)]
struct Led(AtomicBool);

impl OnboardLed for Led {
    fn set(&self, on: bool) {
        self.0.store(on, Ordering::Relaxed);
    }

    fn is_on(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(nvs) = NvsAdapter::new() else {
        return;
    };
    let config = SupervisorConfig {
        command_wait_ms: 0,
        ..Default::default()
    };
    let platform = Platform {
        clock: Arc::new(MonotonicClock::new()),
        config_store: Box::new(nvs),
        ota: Box::new(OtaAdapter::simulated(OtaImageState::PendingVerify)),
        system: Box::new(SystemAdapter::simulated(ResetReason::PowerOn)),
        onboard_led: Arc::new(Led::default()),
    };
    let mut sup = SupervisorBuilder::new(config, platform).build();
    sup.platform_init();
    let handle = sup.handle();

    let ids: Vec<&'static str> = sup.commands().entries().iter().map(|e| e.command_id).collect();

    for chunk in data.split(|&b| b == 0) {
        let Some((&selector, rest)) = chunk.split_first() else {
            continue;
        };
        let id = ids[usize::from(selector) % ids.len()];
        let args = String::from_utf8_lossy(rest);
        let args = (!args.is_empty()).then_some(args.as_ref());

        let _ = handle.submit(id, args);
        assert!(handle.queue_len() <= QUEUE_LENGTH);

        let report = sup.run_once();
        assert_eq!(report.command, Some(id));
        assert!(handle.pending_events().is_empty());
    }
});

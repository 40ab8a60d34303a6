//! Debug printer adapter.
//!
//! Logs every event word it receives (with the names of the well-known
//! bits) and, on the 2 s stage, free heap and uptime. Shutdown silences it.

use std::sync::Arc;

use log::info;

use crate::app::ports::Clock;
use crate::events::EventSet;
use crate::scheduler::IntervalStage;
use crate::supervisor::Adapter;

pub struct DebugAdapter {
    clock: Arc<dyn Clock>,
    enabled: bool,
}

impl DebugAdapter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            enabled: true,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[cfg(target_os = "espidf")]
    fn free_heap_bytes() -> Option<u32> {
        Some(unsafe { esp_idf_svc::sys::esp_get_free_heap_size() })
    }

    #[cfg(not(target_os = "espidf"))]
    fn free_heap_bytes() -> Option<u32> {
        None
    }

    #[cfg(target_os = "espidf")]
    fn log_chip_info() {
        let mut chip = esp_idf_svc::sys::esp_chip_info_t::default();
        unsafe { esp_idf_svc::sys::esp_chip_info(&mut chip) };
        info!(
            "DebugAdapter: {} core(s), silicon revision v{}.{}",
            chip.cores,
            chip.revision / 100,
            chip.revision % 100
        );
    }

    #[cfg(not(target_os = "espidf"))]
    fn log_chip_info() {
        info!("DebugAdapter: host simulation");
    }
}

impl Adapter for DebugAdapter {
    fn name(&self) -> &'static str {
        "debug"
    }

    fn init(&mut self) {
        info!("DebugAdapter: initialising");
        Self::log_chip_info();
    }

    fn shutdown(&mut self) {
        info!("DebugAdapter: shutdown, disabling periodic logging");
        self.enabled = false;
    }

    fn on_event(&mut self, events: EventSet) {
        if !self.enabled {
            return;
        }
        info!("DebugAdapter: event received {}", events);
        for bit in events.iter_named() {
            info!("DebugAdapter:   -> {}", bit.name());
        }
    }

    fn on_interval(&mut self, stage: IntervalStage) {
        if !self.enabled || stage != IntervalStage::Every2s {
            return;
        }
        if let Some(free) = Self::free_heap_bytes() {
            info!("DebugAdapter: free heap {:.2} KB", f64::from(free) / 1024.0);
        }
        info!("DebugAdapter: uptime {} s", self.clock.uptime_secs());
    }
}

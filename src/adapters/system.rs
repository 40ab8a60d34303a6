//! Chip-level system services: reset cause and restart.
//!
//! On ESP-IDF this wraps `esp_reset_reason()` and `esp_restart()`. The
//! simulation backend reports a configurable reset reason and counts
//! restart requests instead of rebooting.

use log::info;

use crate::app::ports::SystemPort;
use crate::safe_mode::ResetReason;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

pub struct SystemAdapter {
    #[cfg(not(target_os = "espidf"))]
    reset_reason: ResetReason,
    #[cfg(not(target_os = "espidf"))]
    restarts: u32,
}

impl Default for SystemAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            reset_reason: ResetReason::PowerOn,
            #[cfg(not(target_os = "espidf"))]
            restarts: 0,
        }
    }

    /// Simulated chip that last reset for `reason`.
    #[cfg(not(target_os = "espidf"))]
    pub fn simulated(reason: ResetReason) -> Self {
        Self {
            reset_reason: reason,
            restarts: 0,
        }
    }

    /// Restarts requested so far (simulation only).
    #[cfg(not(target_os = "espidf"))]
    pub fn restarts(&self) -> u32 {
        self.restarts
    }
}

#[cfg(target_os = "espidf")]
impl SystemPort for SystemAdapter {
    fn reset_reason(&self) -> ResetReason {
        #[allow(non_upper_case_globals)]
        match unsafe { esp_reset_reason() } {
            esp_reset_reason_t_ESP_RST_POWERON => ResetReason::PowerOn,
            esp_reset_reason_t_ESP_RST_EXT => ResetReason::External,
            esp_reset_reason_t_ESP_RST_SW => ResetReason::Software,
            esp_reset_reason_t_ESP_RST_PANIC => ResetReason::Panic,
            esp_reset_reason_t_ESP_RST_INT_WDT => ResetReason::InterruptWatchdog,
            esp_reset_reason_t_ESP_RST_TASK_WDT => ResetReason::TaskWatchdog,
            esp_reset_reason_t_ESP_RST_WDT => ResetReason::Watchdog,
            esp_reset_reason_t_ESP_RST_DEEPSLEEP => ResetReason::DeepSleep,
            esp_reset_reason_t_ESP_RST_BROWNOUT => ResetReason::Brownout,
            esp_reset_reason_t_ESP_RST_SDIO => ResetReason::Sdio,
            _ => ResetReason::Unknown,
        }
    }

    fn restart(&mut self) {
        info!("System: esp_restart()");
        unsafe { esp_restart() }
    }
}

#[cfg(not(target_os = "espidf"))]
impl SystemPort for SystemAdapter {
    fn reset_reason(&self) -> ResetReason {
        self.reset_reason
    }

    fn restart(&mut self) {
        self.restarts += 1;
        info!("System (simulation): restart #{}", self.restarts);
    }
}

//! Supervisor configuration parameters
//!
//! Runtime tunables for the supervisor loop and safe-mode detector.
//! Values are persisted as a postcard blob by the config store and can be
//! overridden through the `setconf` command.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::scheduler::IntervalStage;

/// Maximum number of adapters the registry accepts.
pub const MAX_ADAPTERS: usize = 8;
/// Depth of the command queue.
pub const QUEUE_LENGTH: usize = 16;
/// Maximum number of registered command entries (core + adapters).
pub const MAX_COMMANDS: usize = 64;
/// Maximum number of registered telemetry entries (core + adapters).
pub const MAX_TELEMETRY: usize = 64;

/// Core supervisor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    // --- Safe mode ---
    /// Consecutive abnormal resets before safe mode engages
    pub safe_mode_threshold: u32,
    /// Uptime (seconds) after which the boot counter is cleared
    pub safe_mode_stable_time_secs: u32,

    // --- Dispatch ---
    /// Bounded wait on the command queue per pass (milliseconds, 0 = poll)
    pub command_wait_ms: u32,

    // --- Firmware validation ---
    /// Interval stage on which the OTA image is self-validated
    pub firmware_validation_stage: IntervalStage,

    // --- Task ---
    /// FreeRTOS priority of the supervisor task
    pub task_priority: u8,
    /// Supervisor task stack size (KiB)
    pub task_stack_kb: u16,
    /// CPU core the supervisor task is pinned to
    pub task_core: u8,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            // Safe mode
            safe_mode_threshold: 5,
            safe_mode_stable_time_secs: 60,

            // Dispatch
            command_wait_ms: 100,

            // Firmware validation
            firmware_validation_stage: IntervalStage::Every10s,

            // Task
            task_priority: 5,
            task_stack_kb: 8,
            task_core: 1,
        }
    }
}

impl SupervisorConfig {
    /// Range-check every field before the config is persisted or applied.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.safe_mode_threshold) {
            return Err(ConfigError::ValidationFailed(
                "safe_mode_threshold must be 1–100",
            ));
        }
        if !(10..=86_400).contains(&self.safe_mode_stable_time_secs) {
            return Err(ConfigError::ValidationFailed(
                "safe_mode_stable_time_secs must be 10–86400",
            ));
        }
        if self.command_wait_ms > 1000 {
            return Err(ConfigError::ValidationFailed(
                "command_wait_ms must be 0–1000",
            ));
        }
        // Validation must happen well before the stable-time window clears
        // the boot counter, otherwise a bad image is never rolled back.
        if self.firmware_validation_stage.period_ms()
            > u64::from(self.safe_mode_stable_time_secs) * 1000
        {
            return Err(ConfigError::ValidationFailed(
                "firmware_validation_stage must not exceed the stable-time window",
            ));
        }
        if !(1..=24).contains(&self.task_priority) {
            return Err(ConfigError::ValidationFailed("task_priority must be 1–24"));
        }
        if !(4..=64).contains(&self.task_stack_kb) {
            return Err(ConfigError::ValidationFailed("task_stack_kb must be 4–64"));
        }
        if self.task_core > 1 {
            return Err(ConfigError::ValidationFailed("task_core must be 0 or 1"));
        }
        Ok(())
    }
}

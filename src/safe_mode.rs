//! Crash-loop detection and firmware self-validation.
//!
//! A persisted boot counter tracks consecutive abnormal resets (panic,
//! watchdog). Once it reaches the configured threshold the supervisor
//! enters **safe mode** for the rest of the boot: only adapters that opt in
//! get initialised and receive interval callbacks, leaving enough of the
//! system up (network, OTA) to push a fixed image.
//!
//! ```text
//!        boot
//!         │ read counter, reset reason
//!         ▼
//!   abnormal reset? ──yes──▶ counter += 1, persist
//!         │
//!         ▼
//!   counter >= threshold ? ──yes──▶ SAFE (validate firmware now)
//!         │ no
//!         ▼
//!       NORMAL
//!
//!   5s stage:  counter > 0 && uptime > stable ──▶ persist 0
//!   10s stage: not validated ──▶ validate firmware (once)
//! ```
//!
//! The mode is fixed for the boot. Clearing the counter only affects the
//! next boot.

use log::{error, info, warn};

use crate::app::ports::{ConfigStore, OtaImageState, OtaPort};
use crate::config::SupervisorConfig;
use crate::scheduler::IntervalStage;

/// Cause of the last chip reset, mirroring `esp_reset_reason_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    Unknown,
    PowerOn,
    External,
    Software,
    Panic,
    InterruptWatchdog,
    TaskWatchdog,
    Watchdog,
    DeepSleep,
    Brownout,
    Sdio,
}

impl ResetReason {
    /// Resets that count towards the crash-loop threshold.
    pub const fn is_abnormal(self) -> bool {
        matches!(
            self,
            Self::Panic | Self::InterruptWatchdog | Self::TaskWatchdog | Self::Watchdog
        )
    }
}

/// Snapshot of the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SafeModeState {
    pub boot_counter: u32,
    pub safe_mode_active: bool,
    pub firmware_validated: bool,
}

/// Boot-counter bookkeeping and OTA self-validation.
pub struct SafeModeDetector {
    threshold: u32,
    stable_time_secs: u32,
    validation_stage: IntervalStage,
    state: SafeModeState,
    validation_attempted: bool,
}

impl SafeModeDetector {
    pub fn new(config: &SupervisorConfig) -> Self {
        Self {
            threshold: config.safe_mode_threshold,
            stable_time_secs: config.safe_mode_stable_time_secs,
            validation_stage: config.firmware_validation_stage,
            state: SafeModeState::default(),
            validation_attempted: false,
        }
    }

    /// Fix the mode for this boot. Returns `true` if safe mode is active.
    ///
    /// An abnormal reset increments and persists the counter *before* the
    /// threshold comparison.
    pub fn evaluate_boot(&mut self, store: &mut dyn ConfigStore, reason: ResetReason) -> bool {
        let mut counter = store.boot_counter();

        if reason.is_abnormal() {
            counter = counter.saturating_add(1);
            if let Err(e) = store.set_boot_counter(counter) {
                error!("SafeMode: failed to persist boot counter: {}", e);
            }
        }

        self.state.boot_counter = counter;
        self.state.safe_mode_active = counter >= self.threshold;

        if self.state.safe_mode_active {
            warn!(
                "SafeMode: ENTERING SAFE MODE ({} consecutive abnormal resets, threshold {}, last {:?})",
                counter, self.threshold, reason
            );
        } else {
            info!(
                "SafeMode: normal boot (counter {}/{}, reset {:?})",
                counter, self.threshold, reason
            );
        }
        self.state.safe_mode_active
    }

    /// Self-validate the running image if it is pending verification.
    ///
    /// Runs at most once per boot. An image that is not pending (or whose
    /// state cannot be read) needs no validation. A failing mark-valid
    /// leaves the image unvalidated; the bootloader rolls it back on the
    /// next reset.
    pub fn validate_firmware(&mut self, ota: &mut dyn OtaPort) {
        if self.state.firmware_validated || self.validation_attempted {
            return;
        }
        self.validation_attempted = true;

        match ota.running_image_state() {
            Ok(OtaImageState::PendingVerify) => match ota.mark_valid_cancel_rollback() {
                Ok(()) => {
                    self.state.firmware_validated = true;
                    match ota.running_app_description() {
                        Some(desc) => info!(
                            "SafeMode: firmware {} {} marked valid (rollback cancelled)",
                            desc.project_name, desc.version
                        ),
                        None => info!("SafeMode: firmware marked valid (rollback cancelled)"),
                    }
                }
                Err(e) => error!("SafeMode: mark valid failed: {}", e),
            },
            Ok(state) => {
                self.state.firmware_validated = true;
                info!("SafeMode: running image state {:?}, nothing to validate", state);
            }
            Err(e) => {
                self.state.firmware_validated = true;
                warn!("SafeMode: OTA state unavailable ({}), skipping validation", e);
            }
        }
    }

    /// Core hook, run for every due stage before adapters see it.
    pub fn on_interval(
        &mut self,
        stage: IntervalStage,
        uptime_secs: u64,
        store: &mut dyn ConfigStore,
        ota: &mut dyn OtaPort,
    ) {
        if stage == self.validation_stage {
            self.validate_firmware(ota);
        }

        if stage == IntervalStage::Every5s
            && self.state.boot_counter > 0
            && uptime_secs > u64::from(self.stable_time_secs)
        {
            match store.set_boot_counter(0) {
                Ok(()) => {
                    self.state.boot_counter = 0;
                    if self.state.safe_mode_active {
                        info!("SafeMode: stable for {}s, counter cleared; restart to leave safe mode", uptime_secs);
                    } else {
                        info!("SafeMode: stable for {}s, counter cleared", uptime_secs);
                    }
                }
                Err(e) => error!("SafeMode: failed to clear boot counter: {}", e),
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.safe_mode_active
    }

    pub fn state(&self) -> SafeModeState {
        self.state
    }
}

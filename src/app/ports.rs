//! Port traits: the boundary between the supervisor core and the platform.
//!
//! ```text
//!   Platform adapter ──▶ Port trait ──▶ Supervisor (core)
//! ```
//!
//! Concrete ESP-IDF implementations live in [`crate::adapters`] and
//! [`crate::drivers`]; host tests substitute in-memory mocks. The
//! supervisor only ever sees these traits, so the loop, the dispatcher and
//! the safe-mode detector run unchanged on the host.
//!
//! ## Notes
//!
//! - **ConfigStore** implementations MUST validate before persisting.
//! - **Clock** must be monotonic; wall-clock jumps would break interval
//!   accounting.
//! - All port errors are typed; callers must handle every variant explicitly.

use log::warn;

use crate::config::SupervisorConfig;
use crate::safe_mode::ResetReason;

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source, milliseconds since boot.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;

    /// Whole seconds since boot.
    fn uptime_secs(&self) -> u64 {
        self.now_ms() / 1000
    }
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: core ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for NVS.
///
/// - Keys are namespaced to prevent collisions between subsystems.
/// - Write operations MUST be atomic: no partial writes on power loss.
///   The ESP-IDF NVS API guarantees this natively; in-memory simulation
///   achieves it trivially.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Configuration store port
// ───────────────────────────────────────────────────────────────

/// Persisted configuration plus the crash-loop boot counter.
///
/// # Security
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped, so a `setconf` from the network cannot push the
/// safe-mode threshold out of range.
pub trait ConfigStore: Send {
    /// Persisted boot counter; 0 if never written.
    fn boot_counter(&self) -> u32;

    /// Persist the boot counter.
    fn set_boot_counter(&mut self, value: u32) -> Result<(), StorageError>;

    /// Load configuration.
    /// Returns [`SupervisorConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SupervisorConfig, ConfigError>;

    /// Load and range-check the stored configuration, falling back to
    /// defaults when it is unreadable or out of range.
    fn load_or_default(&self) -> SupervisorConfig {
        match self.load().and_then(|c| c.validate().map(|()| c)) {
            Ok(config) => config,
            Err(e) => {
                warn!("Config: stored config rejected ({}), using defaults", e);
                SupervisorConfig::default()
            }
        }
    }

    /// Validate and persist configuration.
    fn save(&mut self, config: &SupervisorConfig) -> Result<(), ConfigError>;

    /// Merge a JSON object of overrides into the stored configuration,
    /// validate the result, and persist it.
    fn apply_json(&mut self, overrides: &serde_json::Value) -> Result<(), ConfigError>;

    /// Erase the stored configuration (next load yields defaults).
    fn reset(&mut self) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// OTA port
// ───────────────────────────────────────────────────────────────

/// OTA state of the running image, mirroring `esp_ota_img_states_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaImageState {
    New,
    /// First boot after an update; rollback pending until marked valid.
    PendingVerify,
    Valid,
    Invalid,
    Aborted,
    /// Factory or non-OTA partition; nothing to verify.
    Undefined,
}

/// Description of the running application image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDescription {
    pub project_name: String,
    pub version: String,
}

/// Self-validation of a freshly updated firmware image.
pub trait OtaPort: Send {
    fn running_image_state(&self) -> Result<OtaImageState, OtaError>;

    /// Mark the running image valid and cancel the pending rollback.
    fn mark_valid_cancel_rollback(&mut self) -> Result<(), OtaError>;

    fn running_app_description(&self) -> Option<AppDescription>;
}

// ───────────────────────────────────────────────────────────────
// System port
// ───────────────────────────────────────────────────────────────

/// Chip-level services: reset cause and restart.
pub trait SystemPort: Send {
    fn reset_reason(&self) -> ResetReason;

    /// Restart the chip. On target this does not return.
    fn restart(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Onboard LED port
// ───────────────────────────────────────────────────────────────

/// Status LED driven by the `onboard_led` command.
pub trait OnboardLed: Send + Sync {
    fn set(&self, on: bool);
    fn is_on(&self) -> bool;

    fn toggle(&self) {
        self.set(!self.is_on());
    }
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigStore`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Overrides were not a JSON object or did not match the schema.
    InvalidOverride,
    /// Underlying storage failed.
    Storage(StorageError),
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

/// Errors from [`OtaPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaError {
    /// The running partition could not be resolved.
    NoRunningPartition,
    /// OTA state query failed (e.g. factory partition without OTA data).
    StateUnavailable,
    /// Marking the image valid failed; rollback stays pending.
    MarkValidFailed,
}

impl From<StorageError> for ConfigError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::InvalidOverride => write!(f, "invalid config override"),
            Self::Storage(e) => write!(f, "storage: {}", e),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for OtaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoRunningPartition => write!(f, "no running partition"),
            Self::StateUnavailable => write!(f, "OTA state unavailable"),
            Self::MarkValidFailed => write!(f, "mark valid failed"),
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for StorageError {}
impl std::error::Error for OtaError {}

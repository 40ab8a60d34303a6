//! Adapter trait and the fixed-capacity adapter registry.
//!
//! An adapter is one independently developed platform component (LED
//! strip, 1-Wire bus, network stack, debug printer). The supervisor drives
//! every adapter through the same lifecycle, in registration order:
//!
//! ```text
//!   register ──▶ init ──▶ { on_event, on_interval }* ──▶ shutdown
//! ```
//!
//! Every callback has a no-op default, so an adapter only implements the
//! hooks it cares about.

use core::any::Any;

use log::{error, info};

use crate::cmnd::CommandEntry;
use crate::config::MAX_ADAPTERS;
use crate::error::{Result, SupervisorError};
use crate::events::EventSet;
use crate::scheduler::IntervalStage;
use crate::tele::TelemetryEntry;

/// A platform component managed by the supervisor.
pub trait Adapter: Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether the adapter keeps running (`init`, `on_interval`) in safe
    /// mode. Events are delivered regardless.
    fn enable_in_safe_mode(&self) -> bool {
        false
    }

    fn init(&mut self) {}

    fn shutdown(&mut self) {}

    /// Event bits drained this pass. Every adapter sees the full set.
    fn on_event(&mut self, _events: EventSet) {}

    fn on_interval(&mut self, _stage: IntervalStage) {}

    /// Commands merged into the global registry at registration.
    fn commands(&self) -> Vec<CommandEntry> {
        Vec::new()
    }

    /// Telemetry appenders merged into the global registry at registration.
    fn telemetry(&self) -> Vec<TelemetryEntry> {
        Vec::new()
    }

    /// Opaque platform metadata (e.g. Home Assistant discovery info).
    fn metadata(&self) -> Option<&dyn Any> {
        None
    }
}

/// Registration-ordered adapter table.
pub struct AdapterRegistry {
    adapters: heapless::Vec<Box<dyn Adapter>, MAX_ADAPTERS>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: heapless::Vec::new(),
        }
    }

    /// Append an adapter.
    ///
    /// Capacity is checked before anything else; a rejected registration
    /// has no side effects.
    pub fn register(&mut self, adapter: Option<Box<dyn Adapter>>) -> Result<&dyn Adapter> {
        if self.adapters.is_full() {
            error!(
                "Supervisor: cannot register adapter, capacity ({}) exceeded",
                MAX_ADAPTERS
            );
            return Err(SupervisorError::RegistrationCapacityExceeded {
                capacity: MAX_ADAPTERS,
            });
        }
        let Some(adapter) = adapter else {
            error!("Supervisor: refusing to register null adapter");
            return Err(SupervisorError::NullAdapter);
        };

        info!(
            "Supervisor: registered adapter '{}' ({}/{})",
            adapter.name(),
            self.adapters.len() + 1,
            MAX_ADAPTERS
        );
        // Fullness checked above.
        if self.adapters.push(adapter).is_err() {
            return Err(SupervisorError::RegistrationCapacityExceeded {
                capacity: MAX_ADAPTERS,
            });
        }
        Ok(self.adapters[self.adapters.len() - 1].as_ref())
    }

    pub fn as_slice(&self) -> &[Box<dyn Adapter>] {
        &self.adapters
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Adapter>> {
        self.adapters.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

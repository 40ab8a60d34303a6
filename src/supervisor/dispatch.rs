//! Command dispatch queue and the producer-side supervisor handle.
//!
//! Uses an `embassy-sync` bounded channel to hand command jobs from any
//! task to the supervisor loop. Producers never block: a full queue drops
//! the job and reports it.
//!
//! ```text
//! ┌──────────────┐  CommandJob  ┌──────────────┐
//! │ button task  │─────────────▶│              │
//! │ MQTT task    │─────────────▶│  Supervisor  │  one job / pass
//! │ console      │─────────────▶│  loop        │
//! └──────────────┘   (bounded)  └──────────────┘
//! ```

use core::time::Duration;
use std::sync::{Arc, OnceLock};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use log::{debug, error, warn};
use serde_json::{Map, Value};

use crate::cmnd::{CommandEntry, CommandRegistry};
use crate::config::QUEUE_LENGTH;
use crate::error::{Result, SupervisorError};
use crate::events::{EventGroup, EventSet};
use crate::tele::TelemetryRegistry;

/// A resolved command waiting for the loop.
pub struct CommandJob {
    pub entry: CommandEntry,
    pub args: Option<String>,
}

impl CommandJob {
    /// Resolve-time copy of the submitter's arguments.
    fn new(entry: CommandEntry, args: Option<&str>) -> Result<Self> {
        let args = match args {
            Some(src) => {
                let mut owned = String::new();
                owned
                    .try_reserve_exact(src.len())
                    .map_err(|_| SupervisorError::AllocationFailure)?;
                owned.push_str(src);
                Some(owned)
            }
            None => None,
        };
        Ok(Self { entry, args })
    }
}

/// State shared between the loop and every handle.
pub(crate) struct Shared {
    pub(crate) queue: Channel<CriticalSectionRawMutex, CommandJob, QUEUE_LENGTH>,
    pub(crate) events: EventGroup,
    pub(crate) commands: OnceLock<Arc<CommandRegistry>>,
    pub(crate) telemetry: OnceLock<TelemetryRegistry>,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            queue: Channel::new(),
            events: EventGroup::new(),
            commands: OnceLock::new(),
            telemetry: OnceLock::new(),
        }
    }

    /// Take the next job, waiting at most `wait` (zero polls).
    pub(crate) fn receive(&self, wait: Duration) -> Option<CommandJob> {
        if let Ok(job) = self.queue.try_receive() {
            return Some(job);
        }
        if wait.is_zero() {
            return None;
        }
        futures_lite::future::block_on(futures_lite::future::or(
            async { Some(self.queue.receive().await) },
            async {
                async_io_mini::Timer::after(wait).await;
                None
            },
        ))
    }
}

/// Cloneable producer-side API of a running supervisor.
///
/// Safe to use from any task; none of the methods block.
#[derive(Clone)]
pub struct SupervisorHandle {
    shared: Arc<Shared>,
}

impl SupervisorHandle {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Queue `command_id` for execution on the supervisor loop.
    pub fn submit(&self, command_id: &str, args: Option<&str>) -> Result<()> {
        let Some(entry) = self
            .shared
            .commands
            .get()
            .and_then(|reg| reg.find(command_id))
        else {
            warn!("Dispatch: unknown command '{}'", command_id);
            return Err(SupervisorError::UnknownCommand);
        };

        let job = CommandJob::new(entry.clone(), args)?;
        match self.shared.queue.try_send(job) {
            Ok(()) => {
                debug!("Dispatch: queued '{}'", command_id);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                error!(
                    "Dispatch: queue full ({}), '{}' dropped",
                    QUEUE_LENGTH, command_id
                );
                Err(SupervisorError::QueueFull)
            }
        }
    }

    /// OR `events` into the event group. Never blocks.
    pub fn notify(&self, events: EventSet) {
        self.shared.events.notify(events);
    }

    /// Bits set since the last pass, without consuming them.
    pub fn pending_events(&self) -> EventSet {
        self.shared.events.pending()
    }

    /// Build a telemetry document from every registered appender.
    pub fn append_telemetry(&self, doc: &mut Map<String, Value>) {
        if let Some(reg) = self.shared.telemetry.get() {
            reg.append_all(doc);
        }
    }

    /// Run a single appender. Returns `false` for an unknown id.
    pub fn append_telemetry_one(&self, doc: &mut Map<String, Value>, telemetry_id: &str) -> bool {
        self.shared
            .telemetry
            .get()
            .is_some_and(|reg| reg.append_one(doc, telemetry_id))
    }

    /// Frozen command registry, once the supervisor is built.
    pub fn commands(&self) -> Option<&CommandRegistry> {
        self.shared.commands.get().map(AsRef::as_ref)
    }

    /// Jobs currently waiting.
    pub fn queue_len(&self) -> usize {
        self.shared.queue.len()
    }
}

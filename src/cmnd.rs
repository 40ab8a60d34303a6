//! Command registry and handler context.
//!
//! Every adapter contributes a group of named commands at registration
//! time. Commands are submitted by id from any task (button gestures,
//! transports, the console) and executed later on the supervisor loop,
//! one per pass.
//!
//! Handlers receive a [`CommandContext`] that exposes the raw argument
//! string and the few supervisor services a command may need. The core
//! never interprets argument payloads.

use core::fmt;
use std::sync::Arc;

use log::warn;

use crate::app::ports::ConfigStore;
use crate::config::MAX_COMMANDS;
use crate::events::{EventGroup, EventSet};

/// Command callback, run on the supervisor loop.
pub type CommandHandler = Arc<dyn Fn(&mut CommandContext<'_>) + Send + Sync>;

/// A named command.
#[derive(Clone)]
pub struct CommandEntry {
    pub command_id: &'static str,
    pub description: &'static str,
    handler: CommandHandler,
}

impl CommandEntry {
    pub fn new(
        command_id: &'static str,
        description: &'static str,
        handler: impl Fn(&mut CommandContext<'_>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            command_id,
            description,
            handler: Arc::new(handler),
        }
    }

    pub fn invoke(&self, ctx: &mut CommandContext<'_>) {
        (self.handler)(ctx);
    }
}

impl fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry")
            .field("command_id", &self.command_id)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Flat table of every registered command, in registration order.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    entries: heapless::Vec<CommandEntry, MAX_COMMANDS>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one entry. The first registration of an id wins; duplicates and
    /// overflow are logged and dropped.
    pub fn register(&mut self, entry: CommandEntry) -> bool {
        if self.find(entry.command_id).is_some() {
            warn!("Cmnd: duplicate command '{}' ignored", entry.command_id);
            return false;
        }
        let id = entry.command_id;
        if self.entries.push(entry).is_err() {
            warn!("Cmnd: table full ({}), '{}' dropped", MAX_COMMANDS, id);
            return false;
        }
        true
    }

    /// Add a group of entries. Returns how many were accepted.
    pub fn register_group(&mut self, group: impl IntoIterator<Item = CommandEntry>) -> usize {
        group.into_iter().filter(|e| self.register(e.clone())).count()
    }

    pub fn find(&self, command_id: &str) -> Option<&CommandEntry> {
        self.entries.iter().find(|e| e.command_id == command_id)
    }

    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What a handler can see and do while it runs.
pub struct CommandContext<'a> {
    command_id: &'static str,
    args: Option<&'a str>,
    registry: &'a CommandRegistry,
    config_store: &'a mut dyn ConfigStore,
    events: &'a EventGroup,
    restart_requested: &'a mut bool,
}

impl<'a> CommandContext<'a> {
    pub(crate) fn new(
        command_id: &'static str,
        args: Option<&'a str>,
        registry: &'a CommandRegistry,
        config_store: &'a mut dyn ConfigStore,
        events: &'a EventGroup,
        restart_requested: &'a mut bool,
    ) -> Self {
        Self {
            command_id,
            args,
            registry,
            config_store,
            events,
            restart_requested,
        }
    }

    pub fn command_id(&self) -> &'static str {
        self.command_id
    }

    /// Raw argument string, if the submitter supplied one.
    pub fn args(&self) -> Option<&str> {
        self.args
    }

    pub fn registry(&self) -> &CommandRegistry {
        self.registry
    }

    pub fn config_store(&mut self) -> &mut dyn ConfigStore {
        &mut *self.config_store
    }

    /// Ask for a restart once the current pass completes. Adapters are
    /// shut down first.
    pub fn request_restart(&mut self) {
        *self.restart_requested = true;
    }

    pub fn notify(&self, events: EventSet) {
        self.events.notify(events);
    }
}

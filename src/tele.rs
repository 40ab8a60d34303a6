//! Telemetry registry.
//!
//! Adapters contribute named appenders that add their readings to a JSON
//! object. Transports (MQTT state topic, HTTP status page) build one
//! document by calling every appender in registration order.

use core::fmt;
use std::sync::Arc;

use log::warn;
use serde_json::{Map, Value};

use crate::config::MAX_TELEMETRY;

/// Appender callback: `(telemetry_id, document)`.
pub type TelemetryAppender = Arc<dyn Fn(&str, &mut Map<String, Value>) + Send + Sync>;

#[derive(Clone)]
pub struct TelemetryEntry {
    pub telemetry_id: &'static str,
    appender: TelemetryAppender,
}

impl TelemetryEntry {
    pub fn new(
        telemetry_id: &'static str,
        appender: impl Fn(&str, &mut Map<String, Value>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            telemetry_id,
            appender: Arc::new(appender),
        }
    }

    pub fn append(&self, doc: &mut Map<String, Value>) {
        (self.appender)(self.telemetry_id, doc);
    }
}

impl fmt::Debug for TelemetryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelemetryEntry")
            .field("telemetry_id", &self.telemetry_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub struct TelemetryRegistry {
    entries: heapless::Vec<TelemetryEntry, MAX_TELEMETRY>,
}

impl TelemetryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// First registration of an id wins.
    pub fn register(&mut self, entry: TelemetryEntry) -> bool {
        if self.find(entry.telemetry_id).is_some() {
            warn!("Tele: duplicate telemetry '{}' ignored", entry.telemetry_id);
            return false;
        }
        let id = entry.telemetry_id;
        if self.entries.push(entry).is_err() {
            warn!("Tele: table full ({}), '{}' dropped", MAX_TELEMETRY, id);
            return false;
        }
        true
    }

    pub fn register_group(&mut self, group: impl IntoIterator<Item = TelemetryEntry>) -> usize {
        group.into_iter().filter(|e| self.register(e.clone())).count()
    }

    pub fn find(&self, telemetry_id: &str) -> Option<&TelemetryEntry> {
        self.entries.iter().find(|e| e.telemetry_id == telemetry_id)
    }

    /// Run every appender against `doc`.
    pub fn append_all(&self, doc: &mut Map<String, Value>) {
        for entry in &self.entries {
            entry.append(doc);
        }
    }

    /// Run a single appender. Returns `false` for an unknown id.
    pub fn append_one(&self, doc: &mut Map<String, Value>, telemetry_id: &str) -> bool {
        match self.find(telemetry_id) {
            Some(entry) => {
                entry.append(doc);
                true
            }
            None => false,
        }
    }

    pub fn entries(&self) -> &[TelemetryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

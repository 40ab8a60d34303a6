//! Mock platform for integration tests.
//!
//! Every mock keeps its state behind an `Arc`, so a test can hand one copy
//! to the supervisor, keep another for assertions, and carry persisted
//! state (boot counter, OTA state) across simulated reboots.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use cikon::app::ports::{
    AppDescription, Clock, ConfigError, ConfigStore, OnboardLed, OtaError, OtaImageState, OtaPort,
    StorageError, SystemPort,
};
use cikon::cmnd::CommandEntry;
use cikon::config::SupervisorConfig;
use cikon::events::EventSet;
use cikon::safe_mode::ResetReason;
use cikon::scheduler::IntervalStage;
use cikon::supervisor::{Adapter, Platform, Supervisor, SupervisorBuilder, SupervisorHandle};

// ── Clock ─────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct ManualClock(Arc<AtomicU64>);

#[allow(dead_code)]
impl ManualClock {
    pub fn advance(&self, ms: u64) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.0.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

// ── Config store ──────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct StoreState {
    pub boot_counter: u32,
    pub counter_writes: u32,
    pub applied: Vec<serde_json::Value>,
    pub resets: u32,
}

#[derive(Clone, Default)]
pub struct MockStore(pub Arc<Mutex<StoreState>>);

#[allow(dead_code)]
impl MockStore {
    pub fn with_counter(counter: u32) -> Self {
        let store = Self::default();
        store.0.lock().unwrap().boot_counter = counter;
        store
    }

    pub fn counter(&self) -> u32 {
        self.0.lock().unwrap().boot_counter
    }
}

impl ConfigStore for MockStore {
    fn boot_counter(&self) -> u32 {
        self.counter()
    }

    fn set_boot_counter(&mut self, value: u32) -> Result<(), StorageError> {
        let mut s = self.0.lock().unwrap();
        s.boot_counter = value;
        s.counter_writes += 1;
        Ok(())
    }

    fn load(&self) -> Result<SupervisorConfig, ConfigError> {
        Ok(SupervisorConfig::default())
    }

    fn save(&mut self, config: &SupervisorConfig) -> Result<(), ConfigError> {
        config.validate()
    }

    fn apply_json(&mut self, overrides: &serde_json::Value) -> Result<(), ConfigError> {
        if !overrides.is_object() {
            return Err(ConfigError::InvalidOverride);
        }
        self.0.lock().unwrap().applied.push(overrides.clone());
        Ok(())
    }

    fn reset(&mut self) -> Result<(), StorageError> {
        self.0.lock().unwrap().resets += 1;
        Ok(())
    }
}

// ── OTA ───────────────────────────────────────────────────────

#[derive(Debug)]
pub struct OtaState {
    pub image: OtaImageState,
    pub marks: u32,
}

#[derive(Clone)]
pub struct MockOta(pub Arc<Mutex<OtaState>>);

#[allow(dead_code)]
impl MockOta {
    pub fn new(image: OtaImageState) -> Self {
        Self(Arc::new(Mutex::new(OtaState { image, marks: 0 })))
    }

    pub fn marks(&self) -> u32 {
        self.0.lock().unwrap().marks
    }

    pub fn image(&self) -> OtaImageState {
        self.0.lock().unwrap().image
    }
}

impl OtaPort for MockOta {
    fn running_image_state(&self) -> Result<OtaImageState, OtaError> {
        Ok(self.image())
    }

    fn mark_valid_cancel_rollback(&mut self) -> Result<(), OtaError> {
        let mut s = self.0.lock().unwrap();
        s.marks += 1;
        s.image = OtaImageState::Valid;
        Ok(())
    }

    fn running_app_description(&self) -> Option<AppDescription> {
        None
    }
}

// ── System ────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockSystem {
    pub reason: ResetReason,
    pub restarts: Arc<AtomicU32>,
}

impl SystemPort for MockSystem {
    fn reset_reason(&self) -> ResetReason {
        self.reason
    }

    fn restart(&mut self) {
        self.restarts.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Onboard LED ───────────────────────────────────────────────

#[derive(Default)]
pub struct MockLed(AtomicBool);

impl OnboardLed for MockLed {
    fn set(&self, on: bool) {
        self.0.store(on, Ordering::SeqCst);
    }

    fn is_on(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ── Recording adapter ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Init(&'static str),
    Shutdown(&'static str),
    Event(&'static str, EventSet),
    Interval(&'static str, IntervalStage),
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

pub struct RecordingAdapter {
    name: &'static str,
    safe: bool,
    log: CallLog,
    commands: Vec<CommandEntry>,
}

#[allow(dead_code)]
impl RecordingAdapter {
    pub fn new(name: &'static str, log: &CallLog) -> Self {
        Self {
            name,
            safe: false,
            log: Arc::clone(log),
            commands: Vec::new(),
        }
    }

    pub fn safe(mut self) -> Self {
        self.safe = true;
        self
    }

    pub fn with_command(mut self, entry: CommandEntry) -> Self {
        self.commands.push(entry);
        self
    }

    fn record(&self, call: Call) {
        self.log.lock().unwrap().push(call);
    }
}

impl Adapter for RecordingAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn enable_in_safe_mode(&self) -> bool {
        self.safe
    }

    fn init(&mut self) {
        self.record(Call::Init(self.name));
    }

    fn shutdown(&mut self) {
        self.record(Call::Shutdown(self.name));
    }

    fn on_event(&mut self, events: EventSet) {
        self.record(Call::Event(self.name, events));
    }

    fn on_interval(&mut self, stage: IntervalStage) {
        self.record(Call::Interval(self.name, stage));
    }

    fn commands(&self) -> Vec<CommandEntry> {
        self.commands.clone()
    }
}

// ── Rig ───────────────────────────────────────────────────────

/// Handles kept by the test after the mocks move into the supervisor.
#[derive(Clone)]
pub struct Rig {
    pub clock: ManualClock,
    pub store: MockStore,
    pub ota: MockOta,
    pub restarts: Arc<AtomicU32>,
    pub led: Arc<MockLed>,
    pub log: CallLog,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        Self {
            clock: ManualClock::default(),
            store: MockStore::default(),
            ota: MockOta::new(OtaImageState::Valid),
            restarts: Arc::new(AtomicU32::new(0)),
            led: Arc::new(MockLed::default()),
            log: CallLog::default(),
        }
    }

    /// Same persisted state, fresh clock and call log (a reboot).
    pub fn reboot(&self) -> Self {
        Self {
            clock: ManualClock::default(),
            log: CallLog::default(),
            ..self.clone()
        }
    }

    /// Builder with no-wait dispatch so passes never block.
    pub fn builder(&self, reason: ResetReason) -> SupervisorBuilder {
        self.builder_with_config(
            reason,
            SupervisorConfig {
                command_wait_ms: 0,
                ..Default::default()
            },
        )
    }

    pub fn builder_with_config(
        &self,
        reason: ResetReason,
        config: SupervisorConfig,
    ) -> SupervisorBuilder {
        let platform = Platform {
            clock: Arc::new(self.clock.clone()),
            config_store: Box::new(self.store.clone()),
            ota: Box::new(self.ota.clone()),
            system: Box::new(MockSystem {
                reason,
                restarts: Arc::clone(&self.restarts),
            }),
            onboard_led: self.led.clone(),
        };
        SupervisorBuilder::new(config, platform)
    }

    pub fn restarts(&self) -> u32 {
        self.restarts.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.log.lock().unwrap().clear();
    }

    /// Calls recorded for one adapter.
    pub fn calls_for(&self, name: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| match c {
                Call::Init(n) | Call::Shutdown(n) | Call::Event(n, _) | Call::Interval(n, _) => {
                    *n == name
                }
            })
            .collect()
    }
}

/// Two recording adapters `a` (normal) and `b` (safe-mode enabled),
/// built and initialised.
#[allow(dead_code)]
pub fn booted(rig: &Rig, reason: ResetReason) -> (Supervisor, SupervisorHandle) {
    let mut builder = rig.builder(reason);
    builder.register(RecordingAdapter::new("a", &rig.log)).unwrap();
    builder
        .register(RecordingAdapter::new("b", &rig.log).safe())
        .unwrap();
    let mut sup = builder.build();
    sup.platform_init();
    let handle = sup.handle();
    (sup, handle)
}

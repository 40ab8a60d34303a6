//! Supervisor core: the single cooperative loop that drives every adapter.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Supervisor::run_once                    │
//! │                                                              │
//! │  1. command queue ── wait ≤ command_wait_ms ──▶ handler      │
//! │                                   └──▶ set CommandCompleted  │
//! │  2. event group ── take() ──▶ adapter.on_event(bits)  (all)  │
//! │  3. due stages ──▶ core hook ──▶ adapter.on_interval(stage)  │
//! │                                   (skipped in safe mode)     │
//! │  4. restart requested? ──▶ shutdown adapters ──▶ restart     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Construction goes through [`SupervisorBuilder`]: core commands are
//! registered first, then every adapter in order. `build()` freezes the
//! command and telemetry registries; from then on producers only talk to
//! the supervisor through a [`SupervisorHandle`].

mod adapter;
mod builtin;
mod dispatch;

use core::time::Duration;
use std::sync::Arc;

use log::{info, warn};
use serde_json::{Map, Value};

pub use self::adapter::{Adapter, AdapterRegistry};
pub use self::dispatch::{CommandJob, SupervisorHandle};

use self::dispatch::Shared;
use crate::app::ports::{Clock, ConfigStore, OnboardLed, OtaPort, SystemPort};
use crate::cmnd::{CommandContext, CommandRegistry};
use crate::config::SupervisorConfig;
use crate::error::Result;
use crate::events::{EventBit, EventSet};
use crate::safe_mode::{SafeModeDetector, SafeModeState};
use crate::scheduler::{DueStages, IntervalScheduler};
use crate::tele::TelemetryRegistry;

/// Platform services the supervisor runs on.
pub struct Platform {
    pub clock: Arc<dyn Clock>,
    pub config_store: Box<dyn ConfigStore>,
    pub ota: Box<dyn OtaPort>,
    pub system: Box<dyn SystemPort>,
    pub onboard_led: Arc<dyn OnboardLed>,
}

/// What one pass of the loop did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassReport {
    /// Command executed this pass, if any.
    pub command: Option<&'static str>,
    /// Event bits delivered to adapters.
    pub events: EventSet,
    /// Interval stages that fired.
    pub stages: DueStages,
    /// A restart was performed at the end of the pass.
    pub restarted: bool,
}

/// Collects adapters and their command/telemetry groups.
pub struct SupervisorBuilder {
    config: SupervisorConfig,
    platform: Platform,
    shared: Arc<Shared>,
    adapters: AdapterRegistry,
    commands: CommandRegistry,
    telemetry: TelemetryRegistry,
}

impl SupervisorBuilder {
    pub fn new(config: SupervisorConfig, platform: Platform) -> Self {
        let mut commands = CommandRegistry::new();
        commands.register_group(self::builtin::core_commands(Arc::clone(&platform.onboard_led)));
        let mut telemetry = TelemetryRegistry::new();
        telemetry.register_group(self::builtin::core_telemetry(
            Arc::clone(&platform.clock),
            Arc::clone(&platform.onboard_led),
        ));

        Self {
            config,
            platform,
            shared: Arc::new(Shared::new()),
            adapters: AdapterRegistry::new(),
            commands,
            telemetry,
        }
    }

    /// Producer handle; commands submitted before `build()` are rejected
    /// as unknown.
    pub fn handle(&self) -> SupervisorHandle {
        SupervisorHandle::new(Arc::clone(&self.shared))
    }

    pub fn register(&mut self, adapter: impl Adapter + 'static) -> Result<()> {
        self.register_boxed(Some(Box::new(adapter)))
    }

    /// Register an adapter and merge its command and telemetry groups.
    pub fn register_boxed(&mut self, adapter: Option<Box<dyn Adapter>>) -> Result<()> {
        let adapter = self.adapters.register(adapter)?;
        let cmnds = self.commands.register_group(adapter.commands());
        let teles = self.telemetry.register_group(adapter.telemetry());
        if cmnds > 0 || teles > 0 {
            info!(
                "Supervisor: '{}' added {} command(s), {} telemetry",
                adapter.name(),
                cmnds,
                teles
            );
        }
        Ok(())
    }

    /// Freeze the registries and hand over to the loop.
    pub fn build(self) -> Supervisor {
        let Self {
            config,
            platform,
            shared,
            adapters,
            commands,
            telemetry,
        } = self;

        let commands = Arc::new(commands);
        // The builder is consumed here, so these cells are always empty.
        let _ = shared.commands.set(Arc::clone(&commands));
        let _ = shared.telemetry.set(telemetry);

        info!(
            "Supervisor: built with {} adapter(s), {} command(s)",
            adapters.len(),
            commands.len()
        );

        let now = platform.clock.now_ms();
        Supervisor {
            safe_mode: SafeModeDetector::new(&config),
            command_wait: Duration::from_millis(u64::from(config.command_wait_ms)),
            scheduler: IntervalScheduler::new(now),
            config,
            platform,
            shared,
            adapters,
            commands,
            restart_pending: false,
        }
    }
}

/// The running supervisor. Owns every adapter and the platform ports.
pub struct Supervisor {
    config: SupervisorConfig,
    platform: Platform,
    shared: Arc<Shared>,
    adapters: AdapterRegistry,
    commands: Arc<CommandRegistry>,
    scheduler: IntervalScheduler,
    safe_mode: SafeModeDetector,
    command_wait: Duration,
    restart_pending: bool,
}

impl Supervisor {
    /// Boot sequence: fix the safe-mode state, initialise eligible
    /// adapters, then announce `PlatformInitialized`.
    pub fn platform_init(&mut self) {
        let reason = self.platform.system.reset_reason();
        let safe = self
            .safe_mode
            .evaluate_boot(self.platform.config_store.as_mut(), reason);
        if safe {
            self.safe_mode.validate_firmware(self.platform.ota.as_mut());
        }

        for adapter in self.adapters.iter_mut() {
            if safe && !adapter.enable_in_safe_mode() {
                warn!("Supervisor: safe mode, skipping init of '{}'", adapter.name());
                continue;
            }
            info!("Supervisor: init '{}'", adapter.name());
            adapter.init();
        }

        self.scheduler = IntervalScheduler::new(self.platform.clock.now_ms());
        self.shared.events.notify(EventBit::PlatformInitialized.into());
        info!("Supervisor: platform initialised (safe mode: {})", safe);
    }

    /// One loop pass.
    pub fn run_once(&mut self) -> PassReport {
        let mut report = PassReport::default();

        if let Some(job) = self.shared.receive(self.command_wait) {
            let id = job.entry.command_id;
            info!("Supervisor: received command '{}'", id);
            let mut restart = false;
            {
                let mut ctx = CommandContext::new(
                    id,
                    job.args.as_deref(),
                    &self.commands,
                    self.platform.config_store.as_mut(),
                    &self.shared.events,
                    &mut restart,
                );
                job.entry.invoke(&mut ctx);
            }
            self.shared.events.notify(EventBit::CommandCompleted.into());
            self.restart_pending |= restart;
            report.command = Some(id);
        }

        let events = self.shared.events.take();
        if !events.is_empty() {
            for adapter in self.adapters.iter_mut() {
                adapter.on_event(events);
            }
            report.events = events;
        }

        let now = self.platform.clock.now_ms();
        let safe = self.safe_mode.is_active();
        for stage in self.scheduler.due_stages(now) {
            self.safe_mode.on_interval(
                stage,
                now / 1000,
                self.platform.config_store.as_mut(),
                self.platform.ota.as_mut(),
            );
            // Capacity equals the stage count.
            let _ = report.stages.push(stage);
            if safe {
                continue;
            }
            for adapter in self.adapters.iter_mut() {
                adapter.on_interval(stage);
            }
        }

        if self.restart_pending {
            self.restart_pending = false;
            self.shutdown_adapters();
            info!("Supervisor: restarting");
            self.platform.system.restart();
            report.restarted = true;
        }

        report
    }

    /// Loop forever.
    pub fn run(&mut self) -> ! {
        info!(
            "Supervisor: loop started with {} adapter(s)",
            self.adapters.len()
        );
        loop {
            self.run_once();
        }
    }

    /// Call `shutdown()` on every adapter, in registration order.
    pub fn shutdown_adapters(&mut self) {
        for adapter in self.adapters.iter_mut() {
            info!("Supervisor: shutdown '{}'", adapter.name());
            adapter.shutdown();
        }
    }

    pub fn handle(&self) -> SupervisorHandle {
        SupervisorHandle::new(Arc::clone(&self.shared))
    }

    pub fn adapters(&self) -> &[Box<dyn Adapter>] {
        self.adapters.as_slice()
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// Build a telemetry document from every registered appender.
    pub fn telemetry(&self) -> Map<String, Value> {
        let mut doc = Map::new();
        self.handle().append_telemetry(&mut doc);
        doc
    }

    pub fn is_safe_mode_active(&self) -> bool {
        self.safe_mode.is_active()
    }

    pub fn safe_mode_state(&self) -> SafeModeState {
        self.safe_mode.state()
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }
}

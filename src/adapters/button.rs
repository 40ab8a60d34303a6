//! Button adapter: turns gestures into supervisor commands.
//!
//! | Gesture      | Command                    |
//! |--------------|----------------------------|
//! | Short press  | `onboard_led "toggle"`     |
//! | Double press | `sta` (network adapter)    |
//! | Long press   | `ap`  (network adapter)    |
//!
//! A polling task samples the GPIO every [`POLL_INTERVAL`] and submits
//! through a [`SupervisorHandle`], so the loop never waits on the button.

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::Arc;
use std::thread::JoinHandle;

use embedded_hal::digital::InputPin;
use log::{error, info, warn};

use crate::app::ports::Clock;
use crate::drivers::button::{ButtonDriver, ButtonEvent};
use crate::drivers::task_pin::{Core, TaskSpec};
use crate::supervisor::{Adapter, SupervisorHandle};

pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

const POLLER_TASK: TaskSpec = TaskSpec {
    name: "button\0",
    core: Core::Pro,
    priority: 3,
    stack_kb: 4,
};

/// Command (and argument) submitted for a gesture.
pub fn gesture_command(event: ButtonEvent) -> (&'static str, Option<&'static str>) {
    match event {
        ButtonEvent::ShortPress => ("onboard_led", Some("\"toggle\"")),
        ButtonEvent::DoublePress => ("sta", None),
        ButtonEvent::LongPress => ("ap", None),
    }
}

fn dispatch(handle: &SupervisorHandle, event: ButtonEvent) {
    let (command, args) = gesture_command(event);
    info!("ButtonAdapter: {:?} -> '{}'", event, command);
    if let Err(e) = handle.submit(command, args) {
        warn!("ButtonAdapter: '{}' not submitted: {}", command, e);
    }
}

pub struct ButtonAdapter<P> {
    pin: Option<P>,
    active_low: bool,
    handle: SupervisorHandle,
    clock: Arc<dyn Clock>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl<P: InputPin + Send + 'static> ButtonAdapter<P> {
    pub fn new(pin: P, active_low: bool, handle: SupervisorHandle, clock: Arc<dyn Clock>) -> Self {
        Self {
            pin: Some(pin),
            active_low,
            handle,
            clock,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

impl<P: InputPin + Send + 'static> Adapter for ButtonAdapter<P> {
    fn name(&self) -> &'static str {
        "button"
    }

    fn init(&mut self) {
        let Some(pin) = self.pin.take() else {
            warn!("ButtonAdapter: already initialised");
            return;
        };
        let mut driver = ButtonDriver::new(pin, self.active_low);
        let handle = self.handle.clone();
        let clock = Arc::clone(&self.clock);
        let running = Arc::clone(&self.running);
        running.store(true, Ordering::Release);

        let spawned = POLLER_TASK.spawn(move || {
            while running.load(Ordering::Acquire) {
                if let Some(event) = driver.poll(clock.now_ms() as u32) {
                    dispatch(&handle, event);
                }
                std::thread::sleep(POLL_INTERVAL);
            }
        });
        match spawned {
            Ok(worker) => {
                self.worker = Some(worker);
                info!("ButtonAdapter: polling every {:?}", POLL_INTERVAL);
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                error!("ButtonAdapter: failed to start poller: {}", e);
            }
        }
    }

    fn shutdown(&mut self) {
        info!("ButtonAdapter: shutting down");
        self.running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("ButtonAdapter: poller panicked");
            }
        }
    }
}

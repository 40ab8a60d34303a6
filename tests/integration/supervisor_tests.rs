//! Supervisor loop tests: registration, dispatch, event fan-out, intervals
//! and the restart path, driven pass by pass with a manual clock.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use cikon::SupervisorError;
use cikon::app::ports::OnboardLed;
use cikon::cmnd::CommandEntry;
use cikon::config::{MAX_ADAPTERS, QUEUE_LENGTH, SupervisorConfig};
use cikon::events::{EventBit, EventSet};
use cikon::safe_mode::ResetReason;
use cikon::scheduler::IntervalStage;
use cikon::supervisor::{Supervisor, SupervisorHandle};

use crate::mock_platform::{Call, RecordingAdapter, Rig, booted};

/// Run one pass to consume `PlatformInitialized` and forget the init calls.
fn settle(rig: &Rig, sup: &mut Supervisor) {
    sup.run_once();
    rig.clear_calls();
}

// ── Registration ──────────────────────────────────────────────

#[test]
fn registry_rejects_adapter_past_capacity() {
    let rig = Rig::new();
    let mut builder = rig.builder(ResetReason::PowerOn);
    const NAMES: [&str; MAX_ADAPTERS] = ["a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7"];
    for name in NAMES {
        builder
            .register(RecordingAdapter::new(name, &rig.log))
            .expect("within capacity");
    }

    let err = builder
        .register(RecordingAdapter::new("extra", &rig.log))
        .unwrap_err();
    assert_eq!(
        err,
        SupervisorError::RegistrationCapacityExceeded {
            capacity: MAX_ADAPTERS
        }
    );

    let sup = builder.build();
    assert_eq!(sup.adapters().len(), MAX_ADAPTERS);
    assert!(sup.adapters().iter().all(|a| a.name() != "extra"));
}

#[test]
fn registry_rejects_missing_adapter() {
    let rig = Rig::new();
    let mut builder = rig.builder(ResetReason::PowerOn);
    assert_eq!(builder.register_boxed(None), Err(SupervisorError::NullAdapter));
    assert!(builder.build().adapters().is_empty());
}

#[test]
fn adapters_are_initialised_in_registration_order() {
    let rig = Rig::new();
    let (sup, _) = booted(&rig, ResetReason::PowerOn);

    assert_eq!(rig.calls(), vec![Call::Init("a"), Call::Init("b")]);
    let names: Vec<_> = sup.adapters().iter().map(|a| a.name()).collect();
    assert_eq!(names, ["a", "b"]);
}

#[test]
fn platform_initialized_is_delivered_on_first_pass() {
    let rig = Rig::new();
    let (mut sup, handle) = booted(&rig, ResetReason::PowerOn);
    rig.clear_calls();

    let report = sup.run_once();
    let expected = EventSet::from(EventBit::PlatformInitialized);
    assert_eq!(report.events, expected);
    assert_eq!(
        rig.calls(),
        vec![Call::Event("a", expected), Call::Event("b", expected)]
    );
    assert!(handle.pending_events().is_empty());
}

// ── Event fan-out ─────────────────────────────────────────────

#[test]
fn event_reaches_every_adapter_exactly_once() {
    let rig = Rig::new();
    let (mut sup, handle) = booted(&rig, ResetReason::PowerOn);
    settle(&rig, &mut sup);

    handle.notify(EventBit::TimeSynced.into());
    let report = sup.run_once();

    let synced = EventSet::from(EventBit::TimeSynced);
    assert_eq!(report.events, synced);
    assert_eq!(rig.calls_for("a"), vec![Call::Event("a", synced)]);
    assert_eq!(rig.calls_for("b"), vec![Call::Event("b", synced)]);
    assert!(handle.pending_events().is_empty(), "group must read zero after fan-out");

    rig.clear_calls();
    let report = sup.run_once();
    assert!(report.events.is_empty());
    assert!(rig.calls().is_empty(), "no redelivery on the next pass");
}

#[test]
fn repeated_notifications_coalesce_into_one_delivery() {
    let rig = Rig::new();
    let (mut sup, handle) = booted(&rig, ResetReason::PowerOn);
    settle(&rig, &mut sup);

    handle.notify(EventBit::StaReady.into());
    handle.notify(EventBit::StaReady.into());
    handle.notify(EventBit::ApReady.into());
    sup.run_once();

    let both = EventBit::StaReady | EventBit::ApReady;
    assert_eq!(rig.calls_for("a"), vec![Call::Event("a", both)]);
}

#[test]
fn notifications_from_other_threads_are_delivered() {
    let rig = Rig::new();
    let (mut sup, handle) = booted(&rig, ResetReason::PowerOn);
    settle(&rig, &mut sup);

    let workers: Vec<_> = [EventBit::TimeSynced, EventBit::EspNowNetworkReady]
        .into_iter()
        .map(|bit| {
            let h = handle.clone();
            std::thread::spawn(move || h.notify(bit.into()))
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    let report = sup.run_once();
    assert!(report.events.contains(EventBit::TimeSynced));
    assert!(report.events.contains(EventBit::EspNowNetworkReady));
}

// ── Intervals ─────────────────────────────────────────────────

#[test]
fn nothing_is_due_before_the_first_period() {
    let rig = Rig::new();
    let (mut sup, _) = booted(&rig, ResetReason::PowerOn);
    settle(&rig, &mut sup);

    rig.clock.advance(999);
    assert!(sup.run_once().stages.is_empty());
}

#[test]
fn five_seconds_fire_each_shorter_stage_once_in_order() {
    let rig = Rig::new();
    let (mut sup, _) = booted(&rig, ResetReason::PowerOn);
    settle(&rig, &mut sup);

    rig.clock.advance(5_000);
    let report = sup.run_once();

    let expected = [
        IntervalStage::Every1s,
        IntervalStage::Every2s,
        IntervalStage::Every5s,
    ];
    assert_eq!(report.stages.as_slice(), expected);
    let a: Vec<_> = expected.iter().map(|&s| Call::Interval("a", s)).collect();
    assert_eq!(rig.calls_for("a"), a, "no catch-up for missed periods");

    // Stage-major: every adapter sees a stage before the next one fires.
    assert_eq!(
        rig.calls()[..2],
        [
            Call::Interval("a", IntervalStage::Every1s),
            Call::Interval("b", IntervalStage::Every1s)
        ]
    );

    rig.clear_calls();
    rig.clock.advance(1_000);
    let report = sup.run_once();
    assert_eq!(report.stages.as_slice(), [IntervalStage::Every1s]);
}

// ── Dispatch ──────────────────────────────────────────────────

#[test]
fn unknown_command_is_rejected_and_loop_idles() {
    let rig = Rig::new();
    let (mut sup, handle) = booted(&rig, ResetReason::PowerOn);
    settle(&rig, &mut sup);

    assert_eq!(
        handle.submit("no_such_command", None),
        Err(SupervisorError::UnknownCommand)
    );
    assert_eq!(handle.queue_len(), 0);
    let report = sup.run_once();
    assert_eq!(report.command, None);
    assert!(report.events.is_empty(), "no CommandCompleted without a command");
}

#[test]
fn full_queue_drops_and_drains_in_fifo_order() {
    let rig = Rig::new();
    let (mut sup, handle) = booted(&rig, ResetReason::PowerOn);
    settle(&rig, &mut sup);

    for i in 0..QUEUE_LENGTH {
        let state = if i % 2 == 0 { "on" } else { "off" };
        handle.submit("onboard_led", Some(state)).unwrap();
    }
    assert_eq!(
        handle.submit("help", None),
        Err(SupervisorError::QueueFull)
    );
    assert_eq!(handle.queue_len(), QUEUE_LENGTH);

    for i in 0..QUEUE_LENGTH {
        let report = sup.run_once();
        assert_eq!(report.command, Some("onboard_led"), "one job per pass");
        assert_eq!(rig.led.is_on(), i % 2 == 0, "job {} out of order", i);
    }
    assert_eq!(sup.run_once().command, None);
    assert_eq!(handle.queue_len(), 0);
}

#[test]
fn command_completed_follows_the_handler_in_the_same_pass() {
    let rig = Rig::new();
    let (mut sup, handle) = booted(&rig, ResetReason::PowerOn);
    settle(&rig, &mut sup);

    handle.submit("help", None).unwrap();
    let report = sup.run_once();
    assert_eq!(report.command, Some("help"));
    assert_eq!(report.events, EventSet::from(EventBit::CommandCompleted));
}

#[test]
fn handler_can_raise_events_for_the_same_pass() {
    let rig = Rig::new();
    let mut builder = rig.builder(ResetReason::PowerOn);
    builder
        .register(
            RecordingAdapter::new("net", &rig.log).with_command(CommandEntry::new(
                "sync",
                "Pretend a time sync finished",
                |ctx| ctx.notify(EventBit::TimeSynced.into()),
            )),
        )
        .unwrap();
    let mut sup = builder.build();
    sup.platform_init();
    let handle = sup.handle();
    settle(&rig, &mut sup);

    handle.submit("sync", None).unwrap();
    let report = sup.run_once();
    assert_eq!(
        report.events,
        EventBit::TimeSynced | EventBit::CommandCompleted
    );
}

#[test]
fn core_command_wins_over_adapter_duplicate() {
    let rig = Rig::new();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);

    let mut builder = rig.builder(ResetReason::PowerOn);
    builder
        .register(
            RecordingAdapter::new("dup", &rig.log).with_command(CommandEntry::new(
                "help",
                "shadowing attempt",
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                },
            )),
        )
        .unwrap();
    let mut sup = builder.build();
    sup.platform_init();
    let handle = sup.handle();

    let help = sup.commands().find("help").unwrap();
    assert_eq!(help.description, "Show available commands");
    assert_eq!(sup.commands().len(), 5, "duplicate not added");

    handle.submit("help", None).unwrap();
    sup.run_once();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn handle_taken_before_build_works_after_build() {
    let rig = Rig::new();
    let builder = rig.builder(ResetReason::PowerOn);
    let early = builder.handle();
    assert_eq!(early.submit("help", None), Err(SupervisorError::UnknownCommand));

    let mut sup = builder.build();
    sup.platform_init();
    early.submit("help", None).unwrap();
    assert_eq!(sup.run_once().command, Some("help"));
}

// ── Bounded wait ──────────────────────────────────────────────

/// A supervisor with the shipped command wait, settled past its first pass.
fn booted_with_default_wait(rig: &Rig) -> (Supervisor, SupervisorHandle) {
    let mut builder = rig.builder_with_config(ResetReason::PowerOn, SupervisorConfig::default());
    builder.register(RecordingAdapter::new("a", &rig.log)).unwrap();
    let mut sup = builder.build();
    sup.platform_init();
    let handle = sup.handle();
    settle(rig, &mut sup);
    (sup, handle)
}

#[test]
fn idle_pass_waits_for_the_configured_time_then_returns() {
    let rig = Rig::new();
    let (mut sup, _handle) = booted_with_default_wait(&rig);
    assert_eq!(sup.config().command_wait_ms, 100);

    let start = Instant::now();
    let report = sup.run_once();
    let elapsed = start.elapsed();

    assert_eq!(report.command, None);
    assert!(elapsed >= Duration::from_millis(90), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(500), "wait overran: {elapsed:?}");
}

#[test]
fn command_submitted_mid_wait_runs_in_the_same_pass() {
    let rig = Rig::new();
    let (mut sup, handle) = booted_with_default_wait(&rig);

    let producer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        handle.submit("help", None)
    });

    let start = Instant::now();
    let report = sup.run_once();
    let elapsed = start.elapsed();
    producer.join().unwrap().unwrap();

    assert_eq!(report.command, Some("help"));
    assert_eq!(report.events, EventSet::from(EventBit::CommandCompleted));
    assert!(elapsed >= Duration::from_millis(25), "ran before submit: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(95), "waited out the timer: {elapsed:?}");
}

// ── Restart ───────────────────────────────────────────────────

#[test]
fn restart_runs_handler_once_then_shuts_down_and_restarts() {
    let rig = Rig::new();
    let (mut sup, handle) = booted(&rig, ResetReason::PowerOn);
    settle(&rig, &mut sup);

    handle.submit("restart", None).unwrap();
    let report = sup.run_once();

    assert_eq!(report.command, Some("restart"));
    assert!(report.restarted);
    assert_eq!(rig.restarts(), 1);
    assert_eq!(handle.queue_len(), 0);

    let completed = EventSet::from(EventBit::CommandCompleted);
    assert_eq!(
        rig.calls(),
        vec![
            Call::Event("a", completed),
            Call::Event("b", completed),
            Call::Shutdown("a"),
            Call::Shutdown("b"),
        ]
    );

    // The simulated restart returns; the next pass must not repeat it.
    assert!(!sup.run_once().restarted);
    assert_eq!(rig.restarts(), 1);
}

#[test]
fn resetconf_clears_config_and_restarts() {
    let rig = Rig::new();
    let (mut sup, handle) = booted(&rig, ResetReason::PowerOn);
    settle(&rig, &mut sup);

    handle.submit("resetconf", None).unwrap();
    assert!(sup.run_once().restarted);
    assert_eq!(rig.store.0.lock().unwrap().resets, 1);
    assert_eq!(rig.restarts(), 1);
}

// ── Core commands and telemetry ───────────────────────────────

#[test]
fn setconf_applies_json_objects_only() {
    let rig = Rig::new();
    let (mut sup, handle) = booted(&rig, ResetReason::PowerOn);
    settle(&rig, &mut sup);

    handle
        .submit("setconf", Some(r#"{"safe_mode_threshold":3}"#))
        .unwrap();
    handle.submit("setconf", Some("[1,2,3]")).unwrap();
    handle.submit("setconf", Some("{not json")).unwrap();
    handle.submit("setconf", None).unwrap();
    for _ in 0..4 {
        assert_eq!(sup.run_once().command, Some("setconf"));
    }

    let applied = rig.store.0.lock().unwrap().applied.clone();
    assert_eq!(applied, vec![serde_json::json!({"safe_mode_threshold": 3})]);
    assert_eq!(rig.restarts(), 0, "setconf never restarts");
}

#[test]
fn onboard_led_toggle_is_visible_in_telemetry() {
    let rig = Rig::new();
    let (mut sup, handle) = booted(&rig, ResetReason::PowerOn);
    settle(&rig, &mut sup);

    assert_eq!(sup.telemetry()["onboard_led"], false);
    handle.submit("onboard_led", Some("\"toggle\"")).unwrap();
    sup.run_once();
    assert_eq!(sup.telemetry()["onboard_led"], true);

    handle.submit("onboard_led", Some("blink")).unwrap();
    sup.run_once();
    assert_eq!(sup.telemetry()["onboard_led"], true, "bad argument ignored");
}

#[test]
fn uptime_telemetry_tracks_the_clock() {
    let rig = Rig::new();
    let (sup, handle) = booted(&rig, ResetReason::PowerOn);
    rig.clock.set(42_500);

    assert_eq!(sup.telemetry()["uptime"], 42);

    let mut doc = serde_json::Map::new();
    assert!(handle.append_telemetry_one(&mut doc, "uptime"));
    assert!(!handle.append_telemetry_one(&mut doc, "nope"));
    assert_eq!(doc.len(), 1);
}

// ── Button adapter ────────────────────────────────────────────

#[derive(Clone, Default)]
struct ScriptedPin(Arc<std::sync::atomic::AtomicBool>);

impl embedded_hal::digital::ErrorType for ScriptedPin {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::InputPin for ScriptedPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.load(Ordering::SeqCst))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.load(Ordering::SeqCst))
    }
}

#[test]
fn button_short_press_toggles_onboard_led() {
    use cikon::adapters::button::ButtonAdapter;
    use cikon::adapters::time::MonotonicClock;

    let rig = Rig::new();
    let pin = ScriptedPin::default();
    let mut builder = rig.builder(ResetReason::PowerOn);
    let handle = builder.handle();
    builder
        .register(ButtonAdapter::new(
            pin.clone(),
            false,
            handle,
            Arc::new(MonotonicClock::new()),
        ))
        .unwrap();
    let mut sup = builder.build();
    sup.platform_init();

    pin.0.store(true, Ordering::SeqCst);
    std::thread::sleep(Duration::from_millis(150));
    pin.0.store(false, Ordering::SeqCst);

    // Short press is reported once the double-press window closes.
    let deadline = Instant::now() + Duration::from_secs(3);
    let mut executed = None;
    while executed.is_none() && Instant::now() < deadline {
        executed = sup.run_once().command;
        std::thread::sleep(Duration::from_millis(20));
    }

    assert_eq!(executed, Some("onboard_led"));
    assert!(rig.led.is_on());
    sup.shutdown_adapters();
}

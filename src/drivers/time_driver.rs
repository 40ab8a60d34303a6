//! Global time driver for the `async-io-mini` timers.
//!
//! `async_io_mini::Timer` sits on `embassy-time`, which links against a
//! single driver providing the current tick and wake scheduling. Ticks are
//! microseconds: `esp_timer_get_time()` on ESP-IDF, a process-wide
//! `Instant` on the host.
//!
//! Wakes are served by one background thread holding a deadline list, so a
//! timer per supervisor pass does not cost a thread per pass.

use std::sync::{Condvar, Mutex, OnceLock};
use std::task::Waker;
use std::time::Duration;

use embassy_time_driver::Driver;
use log::{error, info};

struct TimerDriver;

embassy_time_driver::time_driver_impl!(static DRIVER: TimerDriver = TimerDriver);

impl Driver for TimerDriver {
    fn now(&self) -> u64 {
        now_us()
    }

    fn schedule_wake(&self, at: u64, waker: &Waker) {
        if at <= now_us() {
            waker.wake_by_ref();
            return;
        }
        match wake_queue() {
            Some(queue) => queue.push(at, waker),
            // No wake thread: fall back to a spurious wake so the timer re-polls.
            None => waker.wake_by_ref(),
        }
    }
}

#[cfg(target_os = "espidf")]
fn now_us() -> u64 {
    (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
}

#[cfg(not(target_os = "espidf"))]
fn now_us() -> u64 {
    static BASE: OnceLock<std::time::Instant> = OnceLock::new();
    BASE.get_or_init(std::time::Instant::now).elapsed().as_micros() as u64
}

struct WakeQueue {
    pending: Mutex<Vec<(u64, Waker)>>,
    changed: Condvar,
}

impl WakeQueue {
    fn push(&self, at: u64, waker: &Waker) {
        let mut pending = match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // A timer re-registers its waker on every poll; keep one deadline per waker.
        if let Some(entry) = pending.iter_mut().find(|(_, w)| w.will_wake(waker)) {
            entry.0 = entry.0.min(at);
        } else {
            pending.push((at, waker.clone()));
        }
        self.changed.notify_one();
    }

    fn run(&self) {
        let mut pending = match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        loop {
            let now = now_us();
            let mut due = Vec::new();
            pending.retain(|(at, waker)| {
                if *at <= now {
                    due.push(waker.clone());
                    false
                } else {
                    true
                }
            });

            if !due.is_empty() {
                drop(pending);
                due.into_iter().for_each(Waker::wake);
                pending = match self.pending.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                continue;
            }

            let next = pending.iter().map(|(at, _)| *at).min();
            pending = match next {
                Some(at) => {
                    let wait = Duration::from_micros(at.saturating_sub(now));
                    match self.changed.wait_timeout(pending, wait) {
                        Ok((guard, _)) => guard,
                        Err(poisoned) => poisoned.into_inner().0,
                    }
                }
                None => match self.changed.wait(pending) {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                },
            };
        }
    }
}

fn wake_queue() -> Option<&'static WakeQueue> {
    static QUEUE: OnceLock<Option<&'static WakeQueue>> = OnceLock::new();
    *QUEUE.get_or_init(|| {
        let queue: &'static WakeQueue = Box::leak(Box::new(WakeQueue {
            pending: Mutex::new(Vec::new()),
            changed: Condvar::new(),
        }));
        match std::thread::Builder::new()
            .name("timer-wake".into())
            .stack_size(4 * 1024)
            .spawn(move || queue.run())
        {
            Ok(_) => {
                info!("TimerDriver: wake thread started");
                Some(queue)
            }
            Err(e) => {
                error!("TimerDriver: failed to start wake thread: {}", e);
                None
            }
        }
    })
}

//! Onboard status LED on a plain GPIO.
//!
//! Generic over any `embedded-hal` 1.0 [`OutputPin`], so the same driver
//! runs on an `esp-idf-hal` `PinDriver` and on a host mock. The logical
//! state is tracked in an atomic, so `is_on()` never touches the pin.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::ports::OnboardLed;

pub struct OnboardLedDriver<P> {
    pin: Mutex<P>,
    active_low: bool,
    on: AtomicBool,
}

impl<P: OutputPin + Send> OnboardLedDriver<P> {
    /// Wrap `pin` and drive it to the off level.
    pub fn new(pin: P, active_low: bool) -> Self {
        let led = Self {
            pin: Mutex::new(pin),
            active_low,
            on: AtomicBool::new(true),
        };
        led.set(false);
        led
    }

    fn drive(&self, on: bool) {
        let Ok(mut pin) = self.pin.lock() else {
            warn!("OnboardLed: pin lock poisoned");
            return;
        };
        let high = on != self.active_low;
        let result = if high { pin.set_high() } else { pin.set_low() };
        if let Err(e) = result {
            warn!("OnboardLed: GPIO write failed: {:?}", e);
        }
    }
}

impl<P: OutputPin + Send> OnboardLed for OnboardLedDriver<P> {
    fn set(&self, on: bool) {
        self.drive(on);
        self.on.store(on, Ordering::Release);
    }

    fn is_on(&self) -> bool {
        self.on.load(Ordering::Acquire)
    }
}

//! Debounced push-button with short, long, and double press detection.
//!
//! ## Hardware
//!
//! Momentary switch on any `embedded-hal` [`InputPin`]. The driver samples
//! the level from a polling task (every few ms) and runs the debounce +
//! gesture state machine on each sample.
//!
//! ## Gesture detection
//!
//! | Gesture      | Condition                              | Event         |
//! |-------------|----------------------------------------|---------------|
//! | Short press | Release < 5s, no second press < 300ms  | `ShortPress`  |
//! | Long press  | Hold >= 5s (fires while still held)    | `LongPress`   |
//! | Double press| Second press within 300ms of release   | `DoublePress` |

use embedded_hal::digital::InputPin;

const DEBOUNCE_MS: u32 = 50;
const LONG_PRESS_MS: u32 = 5000;
const DOUBLE_PRESS_WINDOW_MS: u32 = 300;

/// Button events emitted after gesture classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    ShortPress,
    LongPress,
    DoublePress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GestureState {
    Idle,
    Debounce { since_ms: u32 },
    Pressed { since_ms: u32 },
    WaitSecondPress { released_ms: u32 },
    /// Gesture already reported; wait for release.
    WaitRelease,
}

/// Pure gesture classifier, fed with `(now_ms, pressed)` samples.
#[derive(Debug, Clone)]
pub struct GestureDetector {
    state: GestureState,
}

impl Default for GestureDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureDetector {
    pub const fn new() -> Self {
        Self {
            state: GestureState::Idle,
        }
    }

    /// Feed one level sample. Millisecond timestamps may wrap.
    pub fn update(&mut self, now_ms: u32, pressed: bool) -> Option<ButtonEvent> {
        match self.state {
            GestureState::Idle => {
                if pressed {
                    self.state = GestureState::Debounce { since_ms: now_ms };
                }
                None
            }

            GestureState::Debounce { since_ms } => {
                if !pressed {
                    // Bounce shorter than the debounce window.
                    self.state = GestureState::Idle;
                } else if now_ms.wrapping_sub(since_ms) >= DEBOUNCE_MS {
                    self.state = GestureState::Pressed { since_ms };
                }
                None
            }

            GestureState::Pressed { since_ms } => {
                if !pressed {
                    self.state = GestureState::WaitSecondPress {
                        released_ms: now_ms,
                    };
                    return None;
                }
                if now_ms.wrapping_sub(since_ms) >= LONG_PRESS_MS {
                    self.state = GestureState::WaitRelease;
                    return Some(ButtonEvent::LongPress);
                }
                None
            }

            GestureState::WaitSecondPress { released_ms } => {
                let gap = now_ms.wrapping_sub(released_ms);
                if gap > DOUBLE_PRESS_WINDOW_MS {
                    self.state = if pressed {
                        GestureState::Debounce { since_ms: now_ms }
                    } else {
                        GestureState::Idle
                    };
                    return Some(ButtonEvent::ShortPress);
                }
                if pressed {
                    self.state = GestureState::WaitRelease;
                    return Some(ButtonEvent::DoublePress);
                }
                None
            }

            GestureState::WaitRelease => {
                if !pressed {
                    self.state = GestureState::Idle;
                }
                None
            }
        }
    }
}

/// A button on a GPIO input.
pub struct ButtonDriver<P> {
    pin: P,
    active_low: bool,
    detector: GestureDetector,
}

impl<P: InputPin> ButtonDriver<P> {
    pub fn new(pin: P, active_low: bool) -> Self {
        Self {
            pin,
            active_low,
            detector: GestureDetector::new(),
        }
    }

    /// Sample the pin and classify. A failed read counts as released.
    pub fn poll(&mut self, now_ms: u32) -> Option<ButtonEvent> {
        let level_high = match self.pin.is_high() {
            Ok(high) => high,
            Err(e) => {
                log::warn!("Button: GPIO read failed: {:?}", e);
                self.active_low
            }
        };
        let pressed = level_high != self.active_low;
        self.detector.update(now_ms, pressed)
    }
}

//! Interrupt-safe event bits.
//!
//! Events are produced by:
//! - Adapters (network up, time synced, ...)
//! - Interrupt-deferred callbacks (button gestures, radio frames)
//! - The supervisor itself (command completed, platform initialised)
//!
//! and consumed once per pass by the supervisor loop, which broadcasts the
//! whole snapshot to every adapter.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Adapter     │────▶│              │     │              │
//! │ ISR deferred│────▶│  EventGroup  │────▶│  Supervisor  │
//! │ Supervisor  │────▶│ (AtomicU32)  │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! ## Coalescing
//!
//! The group is a set, not a queue. Setting the same bit twice between
//! two passes is observed **once**; only presence is delivered, never a
//! count or an order.

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

/// FreeRTOS event groups carry 24 usable bits; the rest are reserved.
pub const EVENT_BITS_MASK: u32 = 0x00FF_FFFF;

/// Well-known event bits shared across adapters.
///
/// Allocation is centralised here so one adapter can check another's
/// readiness. Bits 2–3, 7 and 9–23 are free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventBit {
    // ── Supervisor core ───────────────────────────────────
    /// A command handler has returned.
    CommandCompleted = 0,
    /// All eligible adapters have been initialised.
    PlatformInitialized = 1,

    // ── Inet adapter ──────────────────────────────────────
    /// SNTP wall-clock sync completed.
    TimeSynced = 4,
    /// Station interface obtained an IP.
    StaReady = 5,
    /// Soft-AP interface is up.
    ApReady = 6,

    // ── ESP-NOW adapter ───────────────────────────────────
    EspNowNetworkReady = 8,
}

impl EventBit {
    /// All named bits, in bit order.
    pub const ALL: [Self; 6] = [
        Self::CommandCompleted,
        Self::PlatformInitialized,
        Self::TimeSynced,
        Self::StaReady,
        Self::ApReady,
        Self::EspNowNetworkReady,
    ];

    /// Return the bitmask for this event.
    pub const fn mask(self) -> u32 {
        1 << self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::CommandCompleted => "CMND_COMPLETED",
            Self::PlatformInitialized => "PLATFORM_INITIALIZED",
            Self::TimeSynced => "TIME_SYNCED",
            Self::StaReady => "STA_READY",
            Self::ApReady => "AP_READY",
            Self::EspNowNetworkReady => "ESPNOW_NETWORK_READY",
        }
    }
}

/// A snapshot of event bits, delivered by value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EventSet(u32);

impl EventSet {
    pub const EMPTY: Self = Self(0);

    /// Build a set from raw bits (for adapter-private bits).
    /// Bits above the 24-bit event-group width are dropped.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits & EVENT_BITS_MASK)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, bit: EventBit) -> bool {
        self.0 & bit.mask() != 0
    }

    /// True if any bit of `other` is also set here.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[must_use]
    pub const fn with(self, bit: EventBit) -> Self {
        Self(self.0 | bit.mask())
    }

    pub fn insert(&mut self, bit: EventBit) {
        self.0 |= bit.mask();
    }

    /// Named bits present in this set, in bit order.
    pub fn iter_named(self) -> impl Iterator<Item = EventBit> {
        EventBit::ALL.into_iter().filter(move |b| self.contains(*b))
    }
}

impl From<EventBit> for EventSet {
    fn from(bit: EventBit) -> Self {
        Self(bit.mask())
    }
}

impl core::ops::BitOr for EventSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl core::ops::BitOr<EventBit> for EventSet {
    type Output = Self;

    fn bitor(self, rhs: EventBit) -> Self {
        self.with(rhs)
    }
}

impl core::ops::BitOr for EventBit {
    type Output = EventSet;

    fn bitor(self, rhs: Self) -> EventSet {
        EventSet(self.mask() | rhs.mask())
    }
}

impl fmt::Display for EventSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

// ── Lock-free event group ─────────────────────────────────────
//
// Any context ORs bits in; the supervisor swaps the word to zero once
// per pass.  A single atomic word needs no producer/consumer split.

/// Multi-producer event word, drained by the supervisor each pass.
#[derive(Debug, Default)]
pub struct EventGroup {
    bits: AtomicU32,
}

impl EventGroup {
    pub const fn new() -> Self {
        Self {
            bits: AtomicU32::new(0),
        }
    }

    /// OR `events` into the group.
    /// Safe to call from any task or ISR-deferred context; never blocks.
    pub fn notify(&self, events: EventSet) {
        if !events.is_empty() {
            self.bits.fetch_or(events.bits(), Ordering::AcqRel);
        }
    }

    /// Atomically read and clear every pending bit.
    pub fn take(&self) -> EventSet {
        EventSet(self.bits.swap(0, Ordering::AcqRel))
    }

    /// Pending bits without clearing them.
    pub fn pending(&self) -> EventSet {
        EventSet(self.bits.load(Ordering::Acquire))
    }
}

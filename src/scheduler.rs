//! Interval scheduler.
//!
//! Ten fixed cadences drive the periodic work of every adapter. Each stage
//! keeps its own last-fired timestamp; a stage is due when at least its
//! period has elapsed on the monotonic clock.
//!
//! ```text
//!   pass ──▶ due_stages(now) ──▶ [1s, 5s, 10s]  (ascending period)
//!                                   │
//!                                   ├──▶ core hook (safe mode, OTA)
//!                                   └──▶ adapter.on_interval(stage)
//! ```
//!
//! There is no catch-up: a stage that was due several times over (long
//! handler, debugger pause) fires once and re-arms from `now`.

use serde::{Deserialize, Serialize};

/// One of the fixed interval cadences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntervalStage {
    Every1s,
    Every2s,
    Every5s,
    Every10s,
    Every30s,
    Every60s,
    Every5m,
    Every10m,
    Every2h,
    Every12h,
}

/// Number of interval stages.
pub const STAGE_COUNT: usize = 10;

impl IntervalStage {
    /// Every stage, in ascending period order.
    pub const ALL: [Self; STAGE_COUNT] = [
        Self::Every1s,
        Self::Every2s,
        Self::Every5s,
        Self::Every10s,
        Self::Every30s,
        Self::Every60s,
        Self::Every5m,
        Self::Every10m,
        Self::Every2h,
        Self::Every12h,
    ];

    pub const fn period_ms(self) -> u64 {
        match self {
            Self::Every1s => 1_000,
            Self::Every2s => 2_000,
            Self::Every5s => 5_000,
            Self::Every10s => 10_000,
            Self::Every30s => 30_000,
            Self::Every60s => 60_000,
            Self::Every5m => 300_000,
            Self::Every10m => 600_000,
            Self::Every2h => 7_200_000,
            Self::Every12h => 43_200_000,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Every1s => "1s",
            Self::Every2s => "2s",
            Self::Every5s => "5s",
            Self::Every10s => "10s",
            Self::Every30s => "30s",
            Self::Every60s => "60s",
            Self::Every5m => "5m",
            Self::Every10m => "10m",
            Self::Every2h => "2h",
            Self::Every12h => "12h",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl core::fmt::Display for IntervalStage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// Stages that fired in one pass, in ascending period order.
pub type DueStages = heapless::Vec<IntervalStage, STAGE_COUNT>;

/// Per-stage last-fired bookkeeping.
///
/// Pure: the caller supplies `now_ms`, so tests drive it with a fake clock.
#[derive(Debug, Clone)]
pub struct IntervalScheduler {
    last_fired: [u64; STAGE_COUNT],
}

impl IntervalScheduler {
    /// Arm every stage at `now_ms` (loop start).
    pub fn new(now_ms: u64) -> Self {
        Self {
            last_fired: [now_ms; STAGE_COUNT],
        }
    }

    /// Collect every due stage and re-arm it at `now_ms`.
    pub fn due_stages(&mut self, now_ms: u64) -> DueStages {
        let mut due = DueStages::new();
        for stage in IntervalStage::ALL {
            let last = &mut self.last_fired[stage.index()];
            if now_ms.saturating_sub(*last) >= stage.period_ms() {
                *last = now_ms;
                // Capacity equals the stage count; push cannot fail.
                let _ = due.push(stage);
            }
        }
        due
    }

    /// Timestamp at which `stage` last fired (or was armed).
    pub fn last_fired(&self, stage: IntervalStage) -> u64 {
        self.last_fired[stage.index()]
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════

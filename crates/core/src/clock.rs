// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstractions.
//!
//! Deadlines in the scheduler are absolute epoch milliseconds, while elapsed
//! measurements use a monotonic [`Instant`]. A clock is injected into the
//! timer at construction; there is no process-wide default.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of "now" for the scheduler.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Monotonic instant, used for elapsed-time measurements.
    fn now(&self) -> Instant;

    /// Milliseconds since the Unix epoch, used for deadlines.
    fn epoch_ms(&self) -> u64;

    /// Time elapsed since `earlier`, saturating at zero.
    fn elapsed_since(&self, earlier: Instant) -> Duration {
        self.now().saturating_duration_since(earlier)
    }
}

/// Wall-clock epoch with a monotonic instant.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }
}

/// Epoch anchored once at construction and advanced by a monotonic instant.
///
/// Immune to wall-clock steps (NTP adjustments, manual changes), at the cost
/// of drifting from the wall clock over very long uptimes.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    anchor: Instant,
    anchor_epoch_ms: u64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            anchor: Instant::now(),
            anchor_epoch_ms: SystemClock.epoch_ms(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        self.anchor_epoch_ms + self.anchor.elapsed().as_millis() as u64
    }
}

/// Which built-in clock a timer runs on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockSource {
    /// [`SystemClock`]: follows wall-clock adjustments.
    #[default]
    System,
    /// [`MonotonicClock`]: ignores them.
    Monotonic,
}

impl fmt::Display for ClockSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockSource::System => write!(f, "system"),
            ClockSource::Monotonic => write!(f, "monotonic"),
        }
    }
}

impl ClockSource {
    /// A fresh clock of this kind.
    pub fn clock(self) -> SourceClock {
        match self {
            ClockSource::System => SourceClock::System(SystemClock),
            ClockSource::Monotonic => SourceClock::Monotonic(MonotonicClock::new()),
        }
    }
}

impl FromStr for ClockSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Ok(ClockSource::System),
            "monotonic" => Ok(ClockSource::Monotonic),
            other => Err(format!("unknown clock '{other}', expected system or monotonic")),
        }
    }
}

/// A clock picked at runtime from a [`ClockSource`].
#[derive(Debug, Clone, Copy)]
pub enum SourceClock {
    System(SystemClock),
    Monotonic(MonotonicClock),
}

impl SourceClock {
    pub fn source(&self) -> ClockSource {
        match self {
            SourceClock::System(_) => ClockSource::System,
            SourceClock::Monotonic(_) => ClockSource::Monotonic,
        }
    }
}

impl Clock for SourceClock {
    fn now(&self) -> Instant {
        match self {
            SourceClock::System(clock) => clock.now(),
            SourceClock::Monotonic(clock) => clock.now(),
        }
    }

    fn epoch_ms(&self) -> u64 {
        match self {
            SourceClock::System(clock) => clock.epoch_ms(),
            SourceClock::Monotonic(clock) => clock.epoch_ms(),
        }
    }
}

#[derive(Debug)]
struct FakeState {
    now: Instant,
    epoch_ms: u64,
}

/// Manually driven clock for tests. Clones share the same time.
#[derive(Debug, Clone)]
pub struct FakeClock {
    state: Arc<Mutex<FakeState>>,
}

impl FakeClock {
    /// Start at an arbitrary but stable epoch (1_000_000 ms).
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                now: Instant::now(),
                epoch_ms: 1_000_000,
            })),
        }
    }

    /// Move both the instant and the epoch forward.
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock();
        state.now += by;
        state.epoch_ms += by.as_millis() as u64;
    }

    /// Jump the epoch without touching the monotonic instant.
    pub fn set_epoch_ms(&self, epoch_ms: u64) {
        self.state.lock().epoch_ms = epoch_ms;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.state.lock().now
    }

    fn epoch_ms(&self) -> u64 {
        self.state.lock().epoch_ms
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;

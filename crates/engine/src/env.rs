// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the timer.

use tw_core::ClockSource;

/// Base tick override in milliseconds
pub fn tick_ms() -> Option<u64> {
    parse("TW_TICK_MS")
}

/// Slots per wheel level
pub fn slot_size() -> Option<usize> {
    parse("TW_SLOT_SIZE")
}

/// Worker pool size
pub fn workers() -> Option<usize> {
    parse("TW_WORKERS")
}

/// Event channel capacity
pub fn event_buffer() -> Option<usize> {
    parse("TW_EVENT_BUFFER")
}

/// Clock source: `system` or `monotonic`
pub fn clock() -> Option<ClockSource> {
    parse("TW_CLOCK")
}

/// Enable in-process stats: `1`/`true`/`yes` or `0`/`false`/`no`
pub fn stats() -> Option<bool> {
    let value = std::env::var("TW_STATS").ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;

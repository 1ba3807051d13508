// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared human-readable duration formatting.

use std::time::Duration;

/// Format a duration at the precision that matters for timer jitter:
/// `"850µs"`, `"12ms"`, `"1.50s"`, `"2m5s"`, `"1h30m"`.
pub fn format_duration(d: Duration) -> String {
    let micros = d.as_micros();
    if micros < 1_000 {
        format!("{}µs", micros)
    } else if micros < 1_000_000 {
        format!("{}ms", micros / 1_000)
    } else if micros < 60_000_000 {
        format!("{:.2}s", d.as_secs_f64())
    } else {
        let secs = d.as_secs();
        if secs < 3600 {
            match secs % 60 {
                0 => format!("{}m", secs / 60),
                s => format!("{}m{}s", secs / 60, s),
            }
        } else {
            match (secs % 3600) / 60 {
                0 => format!("{}h", secs / 3600),
                m => format!("{}h{}m", secs / 3600, m),
            }
        }
    }
}

/// Format signed milliseconds, e.g. timer drift: `"+3ms"`, `"-1ms"`, `"0ms"`.
pub fn format_drift_ms(ms: i64) -> String {
    if ms > 0 {
        format!("+{}ms", ms)
    } else {
        format!("{}ms", ms)
    }
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;

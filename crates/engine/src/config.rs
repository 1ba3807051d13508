// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer configuration.
//!
//! Layered lowest to highest: defaults, a TOML file, `TW_*` environment
//! variables, then whatever the caller sets. [`TimerConfig::validated`]
//! enforces minimums last and logs every value it has to change.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use tw_core::ClockSource;

/// The base wheel must span at least this much time.
pub const MIN_INTERVAL_MS: u64 = 20;

/// Floor for channel capacities.
pub const MIN_BUFFER: usize = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimerConfig {
    /// Label carried by log spans.
    pub name: String,
    /// Width of one base-wheel bucket.
    pub tick_ms: u64,
    /// Buckets per wheel level.
    pub slot_size: usize,
    /// Capacity of the caller-to-worker event channel.
    pub event_buffer: usize,
    /// Capacity of the poller-to-worker expired-slot channel.
    pub slot_buffer: usize,
    pub worker_pool_size: usize,
    pub worker_queue_size: usize,
    /// Record counters and histograms in-process.
    pub stats: bool,
    /// Clock used by [`Timer::from_config`](crate::Timer::from_config).
    pub clock: ClockSource,
}

impl Default for TimerConfig {
    fn default() -> Self {
        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            name: "timer".to_string(),
            tick_ms: 1,
            slot_size: 64,
            event_buffer: 1024,
            slot_buffer: 256,
            worker_pool_size: parallelism.max(4),
            worker_queue_size: 4096,
            stats: false,
            clock: ClockSource::System,
        }
    }
}

impl TimerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read a TOML file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Overlay `TW_*` environment variables.
    pub fn with_env(mut self) -> Self {
        if let Some(tick_ms) = crate::env::tick_ms() {
            self.tick_ms = tick_ms;
        }
        if let Some(slot_size) = crate::env::slot_size() {
            self.slot_size = slot_size;
        }
        if let Some(workers) = crate::env::workers() {
            self.worker_pool_size = workers;
        }
        if let Some(event_buffer) = crate::env::event_buffer() {
            self.event_buffer = event_buffer;
        }
        if let Some(stats) = crate::env::stats() {
            self.stats = stats;
        }
        if let Some(clock) = crate::env::clock() {
            self.clock = clock;
        }
        self
    }

    /// Clamp every field to its minimum.
    pub fn validated(mut self) -> Self {
        self.tick_ms = adjust("tick_ms", self.tick_ms, self.tick_ms.max(1));

        let min_slots = MIN_INTERVAL_MS.div_ceil(self.tick_ms).max(2) as usize;
        self.slot_size = adjust("slot_size", self.slot_size, self.slot_size.max(min_slots));

        self.event_buffer = adjust("event_buffer", self.event_buffer, self.event_buffer.max(MIN_BUFFER));
        self.slot_buffer = adjust("slot_buffer", self.slot_buffer, self.slot_buffer.max(MIN_BUFFER));
        self.worker_pool_size = adjust("worker_pool_size", self.worker_pool_size, self.worker_pool_size.max(1));
        self.worker_queue_size = adjust(
            "worker_queue_size",
            self.worker_queue_size,
            self.worker_queue_size.max(self.worker_pool_size),
        );
        if self.name.trim().is_empty() {
            warn!(field = "name", applied = "timer", "config value adjusted");
            self.name = "timer".to_string();
        }
        self
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Span of the base wheel.
    pub fn interval_ms(&self) -> u64 {
        self.tick_ms.saturating_mul(self.slot_size as u64)
    }
}

fn adjust<T: PartialEq + std::fmt::Display + Copy>(field: &str, requested: T, applied: T) -> T {
    if requested != applied {
        warn!(field, %requested, %applied, "config value adjusted");
    }
    applied
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

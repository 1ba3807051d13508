// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer observability sink.
//!
//! [`NoopStats`] is the default. [`AtomicStats`] keeps lock-free counters and
//! fixed-bucket histograms that can be read back as a [`StatsSnapshot`].

use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;
use tw_core::CachePadded;

/// Receives timer events. Every method defaults to a no-op.
pub trait Stats: Send + Sync + 'static {
    fn job_added(&self) {}

    /// A job body finished. `latency_ms` is start time minus deadline.
    fn job_executed(&self, _latency_ms: i64, _duration: Duration) {}

    fn job_cancelled(&self) {}

    /// A due job was dropped because the worker pool is released.
    fn job_rejected(&self) {}

    /// A due job found the pool queue full and waits for room.
    fn job_deferred(&self) {}

    fn slot_registered(&self, _level: usize) {}

    /// Poller delivery time minus the slot's expiration.
    fn tick_accuracy(&self, _drift_ms: i64) {}

    fn jobs_alive(&self, _count: usize) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStats;

impl Stats for NoopStats {}

/// Upper bounds, in milliseconds, of each histogram bucket but the last.
pub const BUCKETS_MS: [u64; 10] = [1, 2, 5, 10, 20, 50, 100, 200, 500, 1_000];

const BUCKET_COUNT: usize = BUCKETS_MS.len() + 1;

struct Histogram {
    buckets: [AtomicU64; BUCKET_COUNT],
    sum_ms: AtomicU64,
    max_ms: AtomicU64,
}

impl Histogram {
    fn new() -> Self {
        Self {
            buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            sum_ms: AtomicU64::new(0),
            max_ms: AtomicU64::new(0),
        }
    }

    fn record(&self, ms: u64) {
        let bucket = BUCKETS_MS
            .iter()
            .position(|bound| ms <= *bound)
            .unwrap_or(BUCKETS_MS.len());
        self.buckets[bucket].fetch_add(1, Ordering::Relaxed);
        self.sum_ms.fetch_add(ms, Ordering::Relaxed);
        self.max_ms.fetch_max(ms, Ordering::Relaxed);
    }

    fn snapshot(&self) -> HistogramSnapshot {
        let buckets: Vec<u64> = self
            .buckets
            .iter()
            .map(|b| b.load(Ordering::Relaxed))
            .collect();
        let count = buckets.iter().sum();
        HistogramSnapshot {
            count,
            sum_ms: self.sum_ms.load(Ordering::Relaxed),
            max_ms: self.max_ms.load(Ordering::Relaxed),
            buckets,
        }
    }
}

/// Point-in-time copy of a histogram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub sum_ms: u64,
    pub max_ms: u64,
    /// Counts per bucket; the last bucket is unbounded.
    pub buckets: Vec<u64>,
}

impl HistogramSnapshot {
    /// Upper bound of the bucket holding quantile `q` (0.0..=1.0). Values in
    /// the unbounded bucket report the observed maximum.
    pub fn percentile_ms(&self, q: f64) -> Option<u64> {
        if self.count == 0 {
            return None;
        }
        let rank = ((self.count as f64) * q.clamp(0.0, 1.0)).ceil().max(1.0) as u64;
        let mut seen = 0;
        for (i, n) in self.buckets.iter().enumerate() {
            seen += n;
            if seen >= rank {
                return Some(BUCKETS_MS.get(i).copied().unwrap_or(self.max_ms).min(self.max_ms));
            }
        }
        Some(self.max_ms)
    }

    pub fn mean_ms(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum_ms as f64 / self.count as f64)
    }
}

/// In-process counters and histograms.
pub struct AtomicStats {
    added: CachePadded<AtomicU64>,
    executed: CachePadded<AtomicU64>,
    cancelled: AtomicU64,
    rejected: AtomicU64,
    deferred: AtomicU64,
    slots_registered: AtomicU64,
    alive: AtomicU64,
    last_drift_ms: AtomicI64,
    latency: Histogram,
    duration: Histogram,
    drift: Histogram,
}

impl AtomicStats {
    pub fn new() -> Self {
        Self {
            added: CachePadded::new(AtomicU64::new(0)),
            executed: CachePadded::new(AtomicU64::new(0)),
            cancelled: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            deferred: AtomicU64::new(0),
            slots_registered: AtomicU64::new(0),
            alive: AtomicU64::new(0),
            last_drift_ms: AtomicI64::new(0),
            latency: Histogram::new(),
            duration: Histogram::new(),
            drift: Histogram::new(),
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            added: self.added.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            deferred: self.deferred.load(Ordering::Relaxed),
            slots_registered: self.slots_registered.load(Ordering::Relaxed),
            alive: self.alive.load(Ordering::Relaxed),
            last_drift_ms: self.last_drift_ms.load(Ordering::Relaxed),
            latency: self.latency.snapshot(),
            duration: self.duration.snapshot(),
            drift: self.drift.snapshot(),
        }
    }
}

impl Default for AtomicStats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats for AtomicStats {
    fn job_added(&self) {
        self.added.fetch_add(1, Ordering::Relaxed);
    }

    fn job_executed(&self, latency_ms: i64, duration: Duration) {
        self.executed.fetch_add(1, Ordering::Relaxed);
        self.latency.record(latency_ms.max(0) as u64);
        self.duration.record(duration.as_millis() as u64);
    }

    fn job_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    fn job_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    fn job_deferred(&self) {
        self.deferred.fetch_add(1, Ordering::Relaxed);
    }

    fn slot_registered(&self, _level: usize) {
        self.slots_registered.fetch_add(1, Ordering::Relaxed);
    }

    fn tick_accuracy(&self, drift_ms: i64) {
        self.last_drift_ms.store(drift_ms, Ordering::Relaxed);
        self.drift.record(drift_ms.unsigned_abs());
    }

    fn jobs_alive(&self, count: usize) {
        self.alive.store(count as u64, Ordering::Relaxed);
    }
}

/// Serializable copy of [`AtomicStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub added: u64,
    pub executed: u64,
    pub cancelled: u64,
    pub rejected: u64,
    pub deferred: u64,
    pub slots_registered: u64,
    pub alive: u64,
    pub last_drift_ms: i64,
    pub latency: HistogramSnapshot,
    pub duration: HistogramSnapshot,
    pub drift: HistogramSnapshot,
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;

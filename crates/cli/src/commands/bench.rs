// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `tw bench` - load generator.
//!
//! Schedules a burst of timers with random delays, cancels a share of them,
//! waits for the rest and reports lateness from the timer's own stats.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use clap::Args;
use rand::Rng;
use serde::Serialize;
use tw_core::{format_drift_ms, format_duration, ClockSource};
use tw_engine::{HistogramSnapshot, Scheduler, Timer, TimerConfig, TimerError};

use crate::output::{format_rows, print_json, OutputFormat};

#[cfg(test)]
#[path = "bench_tests.rs"]
mod tests;

#[derive(Args, Debug, Clone)]
pub struct BenchArgs {
    /// Number of timers to schedule
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub tasks: usize,

    /// Upper bound of the random delay, in milliseconds
    #[arg(long = "max-delay-ms", default_value_t = 200)]
    pub max_delay_ms: u64,

    /// Runs per timer (1 = one-shot)
    #[arg(long, default_value_t = 1)]
    pub repeat: usize,

    /// Share of timers cancelled right after scheduling (0.0 to 1.0)
    #[arg(long = "cancel-ratio", default_value_t = 0.0)]
    pub cancel_ratio: f64,

    /// Override the configured tick
    #[arg(long = "tick-ms")]
    pub tick_ms: Option<u64>,

    /// Override the worker pool size
    #[arg(long)]
    pub workers: Option<usize>,

    /// How long to keep waiting after the last deadline, in milliseconds
    #[arg(long = "slack-ms", default_value_t = 500)]
    pub slack_ms: u64,

    /// Override the configured clock: system or monotonic
    #[arg(long)]
    pub clock: Option<ClockSource>,
}

impl BenchArgs {
    fn check(&self) -> Result<()> {
        if self.tasks == 0 {
            bail!("--tasks must be at least 1");
        }
        if self.repeat == 0 {
            bail!("--repeat must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.cancel_ratio) {
            bail!("--cancel-ratio must be between 0 and 1, got {}", self.cancel_ratio);
        }
        Ok(())
    }

    /// Layer the command-line overrides on top of the loaded config.
    fn apply(&self, mut config: TimerConfig) -> TimerConfig {
        if let Some(tick_ms) = self.tick_ms {
            config.tick_ms = tick_ms;
        }
        if let Some(workers) = self.workers {
            config.worker_pool_size = workers;
        }
        if let Some(clock) = self.clock {
            config.clock = clock;
        }
        config.stats = true;
        config
    }
}

/// One planned timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Planned {
    delay_ms: u64,
    cancel: bool,
}

/// Draw every delay and cancel decision up front.
fn plan<R: Rng>(rng: &mut R, args: &BenchArgs, tick_ms: u64) -> Vec<Planned> {
    let max_delay_ms = args.max_delay_ms.max(tick_ms);
    (0..args.tasks)
        .map(|_| Planned {
            delay_ms: rng.random_range(tick_ms..=max_delay_ms),
            cancel: rng.random_bool(args.cancel_ratio),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySummary {
    pub p50_ms: u64,
    pub p90_ms: u64,
    pub p99_ms: u64,
    pub max_ms: u64,
    pub mean_ms: f64,
}

impl LatencySummary {
    fn from_histogram(histogram: &HistogramSnapshot) -> Option<Self> {
        Some(Self {
            p50_ms: histogram.percentile_ms(0.50)?,
            p90_ms: histogram.percentile_ms(0.90)?,
            p99_ms: histogram.percentile_ms(0.99)?,
            max_ms: histogram.max_ms,
            mean_ms: histogram.mean_ms()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchReport {
    pub tasks: usize,
    pub repeat: usize,
    pub tick_ms: u64,
    pub clock: ClockSource,
    pub cancelled: usize,
    pub executed: u64,
    /// Timers still registered when the wait gave up.
    pub pending: usize,
    pub rejected: u64,
    /// Due jobs that waited for room in the worker pool queue.
    pub deferred: u64,
    pub slots_registered: u64,
    pub elapsed_ms: u64,
    pub last_drift_ms: i64,
    pub latency: Option<LatencySummary>,
}

impl BenchReport {
    fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("tasks", format!("{} x {}", self.tasks, self.repeat)),
            ("tick", format!("{}ms", self.tick_ms)),
            ("clock", self.clock.to_string()),
            ("cancelled", self.cancelled.to_string()),
            ("executed", self.executed.to_string()),
            ("pending", self.pending.to_string()),
            ("rejected", self.rejected.to_string()),
            ("deferred", self.deferred.to_string()),
            ("slot rounds", self.slots_registered.to_string()),
            ("elapsed", format_duration(Duration::from_millis(self.elapsed_ms))),
            ("drift", format_drift_ms(self.last_drift_ms)),
        ];
        match &self.latency {
            Some(latency) => {
                rows.push(("latency p50", format!("{}ms", latency.p50_ms)));
                rows.push(("latency p90", format!("{}ms", latency.p90_ms)));
                rows.push(("latency p99", format!("{}ms", latency.p99_ms)));
                rows.push(("latency max", format!("{}ms", latency.max_ms)));
                rows.push(("latency mean", format!("{:.2}ms", latency.mean_ms)));
            }
            None => rows.push(("latency", "-".to_string())),
        }
        rows
    }
}

pub async fn handle(args: BenchArgs, config: TimerConfig, format: OutputFormat) -> Result<()> {
    let report = run(&args, config).await?;
    match format {
        OutputFormat::Text => print!("{}", format_rows(&report.rows())),
        OutputFormat::Json => print_json(&report)?,
    }
    Ok(())
}

async fn run(args: &BenchArgs, config: TimerConfig) -> Result<BenchReport> {
    args.check()?;
    let config = args.apply(config).validated();
    let tick_ms = config.tick_ms;
    let clock = config.clock;
    let planned = plan(&mut rand::rng(), args, tick_ms);

    let timer = Timer::from_config(config)?;
    let executed = Arc::new(AtomicU64::new(0));
    let started = Instant::now();
    let repeat = args.repeat;

    let mut ids = Vec::with_capacity(planned.len());
    let mut last_deadline_ms = 0;
    for p in &planned {
        let delay = Duration::from_millis(p.delay_ms);
        let counter = Arc::clone(&executed);
        let f = move || {
            counter.fetch_add(1, Ordering::Relaxed);
        };
        let id = if repeat > 1 {
            timer
                .schedule_func(move || Scheduler::times(delay, repeat), f)
                .await?
        } else {
            timer.after_func(delay, f).await?
        };
        last_deadline_ms = last_deadline_ms.max(p.delay_ms.saturating_mul(repeat as u64));
        ids.push(id);
    }

    let mut cancelled = 0;
    for (id, p) in ids.iter().zip(&planned) {
        if !p.cancel {
            continue;
        }
        match timer.cancel_task(id).await {
            Ok(()) => cancelled += 1,
            // Already ran to completion.
            Err(TimerError::TaskNotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }
    tracing::info!(tasks = planned.len(), cancelled, %clock, "bench scheduled");

    let give_up = started + Duration::from_millis(last_deadline_ms.saturating_add(args.slack_ms));
    let poll = Duration::from_millis(tick_ms.max(5));
    while !timer.is_empty() && Instant::now() < give_up {
        tokio::time::sleep(poll).await;
    }

    let elapsed_ms = started.elapsed().as_millis() as u64;
    let pending = timer.len();
    let stats = timer.stats();
    timer.shutdown();

    Ok(BenchReport {
        tasks: args.tasks,
        repeat,
        tick_ms,
        clock,
        cancelled,
        executed: executed.load(Ordering::Relaxed),
        pending,
        rejected: stats.as_ref().map_or(0, |s| s.rejected),
        deferred: stats.as_ref().map_or(0, |s| s.deferred),
        slots_registered: stats.as_ref().map_or(0, |s| s.slots_registered),
        elapsed_ms,
        last_drift_ms: stats.as_ref().map_or(0, |s| s.last_drift_ms),
        latency: stats
            .as_ref()
            .and_then(|s| LatencySummary::from_histogram(&s.latency)),
    })
}

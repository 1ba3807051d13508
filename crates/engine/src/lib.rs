// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Hierarchical timing-wheel scheduler driven by a delay queue

pub mod config;
pub mod delay_queue;
pub mod env;
mod error;
mod event;
pub mod event_bus;
pub mod pool;
mod registry;
mod runtime;
mod scheduler;
pub mod slot;
pub mod stats;
pub mod task;
mod timer;
pub mod wheel;

#[cfg(test)]
mod test_helpers;

pub use config::{ConfigError, TimerConfig};
pub use delay_queue::{DelayQueue, PollExit};
pub use error::TimerError;
pub use event_bus::{BusError, EventBus, EventReader};
pub use pool::{PoolError, PoolJob, PoolSlot, WorkerPool};
pub use scheduler::Scheduler;
pub use stats::{AtomicStats, HistogramSnapshot, NoopStats, Stats, StatsSnapshot};
pub use task::{SlotLink, SlotSnapshot, Task, TaskBuilder, TaskKind};
pub use timer::{Timer, TimerBuilder};
pub use wheel::{Placed, SlotKey, TimingWheel};

pub use tw_core::{
    job, Clock, ClockSource, FakeClock, IdGen, Job, JobId, JobKind, MonotonicClock, SourceClock,
    SystemClock,
};

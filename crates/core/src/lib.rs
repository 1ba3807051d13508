// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tw-core: building blocks shared by the timing-wheel scheduler

pub mod cache;
pub mod clock;
pub mod id;
pub mod job;
pub mod priority_queue;
pub mod time_fmt;

pub use cache::CachePadded;
pub use clock::{Clock, ClockSource, FakeClock, MonotonicClock, SourceClock, SystemClock};
pub use id::{IdGen, SequentialIdGen, ShortId, SnowflakeIdGen};
pub use job::{job, Job, JobId, JobKind};
pub use priority_queue::{Item, PriorityQueue, SharedPriorityQueue};
pub use time_fmt::{format_drift_ms, format_duration};

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The timer's single-writer state machine.
//!
//! `Runtime` owns the wheel. Only the event worker calls into it, so wheel
//! and slot state are never shared.

mod handlers;

use crate::config::TimerConfig;
use crate::delay_queue::DelayQueue;
use crate::event::Event;
use crate::pool::{PoolError, PoolJob, PoolSlot, WorkerPool};
use crate::registry::Registry;
use crate::stats::Stats;
use crate::wheel::{SlotKey, TimingWheel};
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, warn};
use tw_core::Clock;

/// Collaborators shared with the timer handle.
pub(crate) struct RuntimeDeps {
    pub queue: Arc<DelayQueue<SlotKey>>,
    pub registry: Registry,
    pub pool: Arc<WorkerPool>,
    pub stats: Arc<dyn Stats>,
}

pub(crate) struct Runtime<C: Clock> {
    pub(crate) clock: C,
    pub(crate) tick_ms: i64,
    pub(crate) wheel: TimingWheel,
    pub(crate) registry: Registry,
    pub(crate) pool: Arc<WorkerPool>,
    pub(crate) stats: Arc<dyn Stats>,
    /// Due jobs the pool had no room for, oldest first.
    pub(crate) backlog: VecDeque<PoolJob>,
}

impl<C: Clock> Runtime<C> {
    pub(crate) fn new(config: &TimerConfig, clock: C, deps: RuntimeDeps) -> Self {
        let tick_ms = config.tick_ms.max(1) as i64;
        let start_ms = clock.epoch_ms() as i64;
        Self {
            wheel: TimingWheel::new(tick_ms, config.slot_size, start_ms, deps.queue),
            clock,
            tick_ms,
            registry: deps.registry,
            pool: deps.pool,
            stats: deps.stats,
            backlog: VecDeque::new(),
        }
    }

    pub(crate) fn now_ms(&self) -> i64 {
        self.clock.epoch_ms() as i64
    }

    /// Handle `event` and everything it produces, in order.
    ///
    /// A panic while handling one event is logged and that event is dropped;
    /// the loop carries on with the rest.
    pub(crate) fn process(&mut self, event: Event) {
        let mut pending = VecDeque::from([event]);
        while let Some(event) = pending.pop_front() {
            let name = event.name();
            match catch_unwind(AssertUnwindSafe(|| self.handle_event(event))) {
                Ok(produced) => pending.extend(produced),
                Err(_) => error!(event = name, "event handler panicked"),
            }
        }
    }

    pub(crate) fn has_backlog(&self) -> bool {
        !self.backlog.is_empty()
    }

    /// Hand a due job to the pool, parking it behind any earlier jobs that
    /// are still waiting for room.
    pub(crate) fn dispatch(&mut self, job: PoolJob) -> Result<(), PoolError> {
        if self.has_backlog() {
            self.backlog.push_back(job);
            return Ok(());
        }
        match self.pool.try_submit(job) {
            Ok(()) => Ok(()),
            Err((PoolError::Overloaded, job)) => {
                self.backlog.push_back(job);
                self.stats.job_deferred();
                Ok(())
            }
            Err((e, _)) => Err(e),
        }
    }

    /// Fill `slot` with the oldest backlogged job, then queue as many more
    /// as fit without waiting.
    pub(crate) fn drain_backlog(&mut self, slot: PoolSlot) {
        let Some(job) = self.backlog.pop_front() else {
            return;
        };
        slot.submit(job);
        while let Some(job) = self.backlog.pop_front() {
            match self.pool.try_submit(job) {
                Ok(()) => {}
                Err((PoolError::Overloaded, job)) => {
                    self.backlog.push_front(job);
                    break;
                }
                Err((e, job)) => {
                    self.backlog.push_front(job);
                    self.abandon_backlog(e);
                    break;
                }
            }
        }
    }

    /// Drop every backlogged job; the pool will never take them.
    pub(crate) fn abandon_backlog(&mut self, error: PoolError) {
        let dropped = self.backlog.len();
        if dropped == 0 {
            return;
        }
        self.backlog.clear();
        for _ in 0..dropped {
            self.stats.job_rejected();
        }
        warn!(dropped, error = %error, "backlogged jobs dropped");
    }
}

#[cfg(test)]
#[path = "../runtime_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event handling for the runtime

use super::Runtime;
use crate::error::TimerError;
use crate::event::Event;
use crate::registry::Registry;
use crate::task::{SlotLink, Task, TaskKind};
use crate::wheel::SlotKey;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use tw_core::Clock;

impl<C: Clock> Runtime<C> {
    /// Handle one event and return any produced events
    pub(crate) fn handle_event(&mut self, event: Event) -> Vec<Event> {
        let mut result_events = Vec::new();
        match event {
            Event::Add(task) | Event::Readd(task) => self.insert(task, &mut result_events),
            Event::Cancel(task) => self.cancel(&task),
            Event::Expired(key) => self.expire(key, &mut result_events),
        }
        result_events
    }

    fn insert(&mut self, task: Arc<Task>, out: &mut Vec<Event>) {
        if task.is_cancelled() {
            trace!(job_id = %task.id(), "dropping cancelled task");
            self.registry.remove_if_same(&task);
            return;
        }

        let now = self.now_ms();
        self.wheel.advance_clock(now);

        let mut displaced = Vec::new();
        match self.wheel.add_task(&task, now, &mut displaced) {
            Ok(placed) => {
                if placed.registered {
                    self.stats.slot_registered(placed.key.level);
                }
            }
            Err(TimerError::TaskIsExpired) => self.handle_task(task, now, out),
            Err(e) => {
                warn!(job_id = %task.id(), error = %e, "task not scheduled");
                self.registry.remove_if_same(&task);
            }
        }
        for stale in displaced {
            self.handle_task(stale, now, out);
        }
    }

    fn cancel(&mut self, task: &Arc<Task>) {
        task.cancel();
        let unlinked = self.wheel.remove_task(task);
        self.registry.remove_if_same(task);
        self.stats.job_cancelled();
        debug!(job_id = %task.id(), unlinked, "task cancelled");
    }

    fn expire(&mut self, key: SlotKey, out: &mut Vec<Event>) {
        let now = self.now_ms();
        self.wheel.advance_clock(key.expiration_ms);
        self.stats.tick_accuracy(now - key.expiration_ms);

        let Some(slot) = self.wheel.slot_mut(key.level, key.index) else {
            return;
        };
        if slot.expiration_ms() != key.expiration_ms {
            // The cell moved on to another round since this one was offered.
            trace!(level = key.level, index = key.index, "stale slot expiration");
            return;
        }
        slot.reset();
        let mut flushed = Vec::with_capacity(slot.len());
        slot.flush(|task| flushed.push(task));
        debug!(
            level = key.level,
            index = key.index,
            expiration_ms = key.expiration_ms,
            tasks = flushed.len(),
            "slot flushed"
        );

        for task in flushed {
            self.handle_task(task, now, out);
        }
        self.stats.jobs_alive(self.registry.len());
    }

    /// Run `task` if it is due, otherwise send it back through the wheel.
    fn handle_task(&mut self, task: Arc<Task>, now: i64, out: &mut Vec<Event>) {
        if task.is_cancelled() {
            self.wheel.remove_task(&task);
            self.registry.remove_if_same(&task);
            return;
        }
        if !self.is_due(&task, now) {
            out.push(Event::Readd(task));
            return;
        }

        task.detach();
        let next_delay = match task.kind() {
            TaskKind::Once => None,
            TaskKind::Repeated(scheduler) => scheduler.lock().next_delay(),
        };
        self.execute(&task, next_delay.is_none());

        let Some(delay) = next_delay else {
            if matches!(task.kind(), TaskKind::Repeated(_)) {
                task.cancel();
                debug!(job_id = %task.id(), "schedule exhausted");
            }
            return;
        };
        // Fixed rate: measured from the previous deadline, not from now.
        let delay_ms = (delay.as_millis() as i64).max(self.tick_ms);
        let next_ms = task.expired_ms().saturating_add(delay_ms);
        task.set_expired_ms(next_ms);
        out.push(Event::Readd(task));
    }

    fn is_due(&self, task: &Task, now: i64) -> bool {
        let previous = task.previous_slot();
        task.link() == SlotLink::Immediate
            || previous.is_immediate()
            || (previous.level == 0
                && (task.expired_ms() - previous.expiration_ms).abs() < self.tick_ms)
            || task.expired_ms() <= now
    }

    /// Hand the task's job to the pool. A task on its last run stays
    /// registered until the job has finished.
    fn execute(&mut self, task: &Arc<Task>, last_run: bool) {
        let job = Arc::clone(task.job());
        let stats = Arc::clone(&self.stats);
        let clock = self.clock.clone();
        let expired_ms = task.expired_ms();
        let finish = last_run.then(|| Finish {
            registry: self.registry.clone(),
            task: Arc::clone(task),
        });

        let dispatched = self.dispatch(Box::new(move || {
            let _finish = finish;
            let started = clock.now();
            let latency_ms = clock.epoch_ms() as i64 - expired_ms;
            job();
            stats.job_executed(latency_ms, clock.elapsed_since(started));
        }));
        match dispatched {
            Ok(()) => trace!(job_id = %task.id(), "job dispatched"),
            Err(e) => {
                self.stats.job_rejected();
                warn!(job_id = %task.id(), error = %e, "job rejected");
            }
        }
    }
}

/// Unregisters a finished task once its last job is done with, whether the
/// job returned, panicked or was dropped unrun.
struct Finish {
    registry: Registry,
    task: Arc<Task>,
}

impl Drop for Finish {
    fn drop(&mut self) {
        self.registry.remove_if_same(&self.task);
    }
}

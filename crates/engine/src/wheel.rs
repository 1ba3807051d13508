// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hierarchical timing wheel.
//!
//! Level `L` has `slot_size` buckets of `tick_ms_L` each, so it spans
//! `interval_L = tick_ms_L * slot_size`. The overflow wheel at `L + 1` is
//! built lazily with `tick_ms_{L+1} = interval_L`. A bucket is registered
//! with the shared delay queue once per round, not once per task.
//!
//! The wheel has no locks. It is owned by the timer's event worker, which is
//! the only code that ever mutates it.

use crate::delay_queue::DelayQueue;
use crate::error::TimerError;
use crate::slot::Slot;
use crate::task::{SlotLink, SlotSnapshot, Task, EXPIRATION_UNSET};
use std::sync::Arc;
use tracing::{debug, trace};

/// Delay-queue entry naming one round of one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub level: usize,
    pub index: usize,
    pub expiration_ms: i64,
}

/// Where [`TimingWheel::add_task`] put a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placed {
    pub key: SlotKey,
    /// The bucket started a new round and was offered to the delay queue.
    pub registered: bool,
}

pub struct TimingWheel {
    tick_ms: i64,
    slot_size: usize,
    interval_ms: i64,
    current_time_ms: i64,
    level: usize,
    slots: Vec<Slot>,
    overflow: Option<Box<TimingWheel>>,
    queue: Arc<DelayQueue<SlotKey>>,
}

impl TimingWheel {
    /// Base wheel starting at `start_ms`.
    pub fn new(tick_ms: i64, slot_size: usize, start_ms: i64, queue: Arc<DelayQueue<SlotKey>>) -> Self {
        Self::at_level(tick_ms.max(1), slot_size.max(1), 0, start_ms, queue)
    }

    fn at_level(
        tick_ms: i64,
        slot_size: usize,
        level: usize,
        start_ms: i64,
        queue: Arc<DelayQueue<SlotKey>>,
    ) -> Self {
        Self {
            tick_ms,
            slot_size,
            interval_ms: tick_ms.saturating_mul(slot_size as i64),
            current_time_ms: truncate(start_ms, tick_ms),
            level,
            slots: (0..slot_size).map(|id| Slot::new(id, level)).collect(),
            overflow: None,
            queue,
        }
    }

    pub fn tick_ms(&self) -> i64 {
        self.tick_ms
    }

    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    pub fn interval_ms(&self) -> i64 {
        self.interval_ms
    }

    pub fn level(&self) -> usize {
        self.level
    }

    /// Tick-truncated logical clock of this level.
    pub fn current_time_ms(&self) -> i64 {
        self.current_time_ms
    }

    pub fn overflow(&self) -> Option<&TimingWheel> {
        self.overflow.as_deref()
    }

    /// Number of levels built so far, this one included.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut wheel = self;
        while let Some(next) = wheel.overflow.as_deref() {
            depth += 1;
            wheel = next;
        }
        depth
    }

    /// Tasks linked into buckets across every level.
    pub fn task_count(&self) -> usize {
        let mut count = 0;
        let mut wheel = Some(self);
        while let Some(w) = wheel {
            count += w.slots.iter().map(Slot::len).sum::<usize>();
            wheel = w.overflow.as_deref();
        }
        count
    }

    pub fn level_ref(&self, level: usize) -> Option<&TimingWheel> {
        let mut wheel = self;
        while wheel.level < level {
            wheel = wheel.overflow.as_deref()?;
        }
        (wheel.level == level).then_some(wheel)
    }

    pub fn level_mut(&mut self, level: usize) -> Option<&mut TimingWheel> {
        let mut wheel = self;
        while wheel.level < level {
            wheel = wheel.overflow.as_deref_mut()?;
        }
        (wheel.level == level).then_some(wheel)
    }

    pub fn slot(&self, level: usize, index: usize) -> Option<&Slot> {
        self.level_ref(level)?.slots.get(index)
    }

    pub fn slot_mut(&mut self, level: usize, index: usize) -> Option<&mut Slot> {
        self.level_mut(level)?.slots.get_mut(index)
    }

    /// Place `task` in the lowest level whose interval covers its deadline.
    ///
    /// Returns [`TimerError::TaskIsExpired`] for a deadline closer than one
    /// base tick; the task is then marked immediate and must be run by the
    /// caller. Tasks of an older round evicted from a reused bucket are pushed
    /// to `displaced` and are also the caller's to handle.
    pub fn add_task(
        &mut self,
        task: &Arc<Task>,
        now_ms: i64,
        displaced: &mut Vec<Arc<Task>>,
    ) -> Result<Placed, TimerError> {
        if task.id().is_empty() {
            return Err(TimerError::EmptyJobId);
        }
        if task.is_cancelled() {
            return Err(TimerError::TaskCancelled(task.id().clone()));
        }

        let diff = task.expired_ms().saturating_sub(now_ms);
        if diff < self.tick_ms {
            task.attach(SlotLink::Immediate, SlotSnapshot::IMMEDIATE);
            trace!(job_id = %task.id(), diff_ms = diff, "routed to immediate slot");
            return Err(TimerError::TaskIsExpired);
        }

        let mut wheel = self;
        loop {
            if diff < wheel.interval_ms {
                return Ok(wheel.place(task, displaced));
            }
            wheel = wheel.overflow_or_create();
        }
    }

    fn overflow_or_create(&mut self) -> &mut TimingWheel {
        let tick_ms = self.interval_ms;
        let slot_size = self.slot_size;
        let level = self.level + 1;
        let start_ms = self.current_time_ms;
        let queue = &self.queue;
        self.overflow.get_or_insert_with(|| {
            debug!(level, tick_ms, "creating overflow wheel");
            Box::new(TimingWheel::at_level(
                tick_ms,
                slot_size,
                level,
                start_ms,
                Arc::clone(queue),
            ))
        })
    }

    fn place(&mut self, task: &Arc<Task>, displaced: &mut Vec<Arc<Task>>) -> Placed {
        let virtual_id = task.expired_ms().div_euclid(self.tick_ms);
        let index = virtual_id.rem_euclid(self.slot_size as i64) as usize;
        let slot_exp = virtual_id.saturating_mul(self.tick_ms);
        let level = self.level;

        let slot = &mut self.slots[index];
        let current = slot.expiration_ms();
        let mut registered = false;

        if current != slot_exp {
            if current != EXPIRATION_UNSET && current > slot_exp {
                // A later round already owns the cell (clock stepped back).
                // Ride along with it rather than re-register an earlier one.
                slot.add_task(task);
                trace!(job_id = %task.id(), level, index, slot_exp = current, "joined later round");
                return Placed {
                    key: SlotKey {
                        level,
                        index,
                        expiration_ms: current,
                    },
                    registered,
                };
            }
            if current != EXPIRATION_UNSET {
                // Older round still in the cell: already due, hand it back.
                slot.flush(|stale| displaced.push(stale));
            }
            slot.set_expiration(slot_exp);
            self.queue.offer(
                SlotKey {
                    level,
                    index,
                    expiration_ms: slot_exp,
                },
                slot_exp,
            );
            registered = true;
            debug!(level, index, expiration_ms = slot_exp, "slot registered");
        }

        let slot = &mut self.slots[index];
        let added = slot.add_task(task);
        debug_assert!(added, "open slot refused a task");
        trace!(job_id = %task.id(), level, index, expiration_ms = slot_exp, "task placed");

        Placed {
            key: SlotKey {
                level,
                index,
                expiration_ms: slot_exp,
            },
            registered,
        }
    }

    /// Move the logical clock forward to `deadline_ms`, truncated to each
    /// level's tick, propagating up the overflow chain. Never moves backwards.
    pub fn advance_clock(&mut self, deadline_ms: i64) {
        let mut wheel = self;
        let mut deadline = deadline_ms;
        loop {
            if deadline < wheel.current_time_ms.saturating_add(wheel.tick_ms) {
                return;
            }
            deadline = truncate(deadline, wheel.tick_ms);
            wheel.current_time_ms = deadline;
            match wheel.overflow.as_deref_mut() {
                Some(next) => wheel = next,
                None => return,
            }
        }
    }

    /// Unlink `task` from whichever bucket holds it.
    pub fn remove_task(&mut self, task: &Task) -> bool {
        match task.link() {
            SlotLink::Linked { level, index, .. } => self
                .slot_mut(level, index)
                .is_some_and(|slot| slot.remove_task(task)),
            SlotLink::Immediate | SlotLink::Detached => false,
        }
    }
}

fn truncate(ms: i64, tick_ms: i64) -> i64 {
    ms - ms.rem_euclid(tick_ms)
}

#[cfg(test)]
#[path = "wheel_tests.rs"]
mod tests;

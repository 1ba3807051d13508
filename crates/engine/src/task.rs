// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deferred tasks: identity, deadline, job body and wheel placement.

use crate::error::TimerError;
use crate::scheduler::Scheduler;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tw_core::{Job, JobId, JobKind};

/// Slot expiration of a bucket that holds no round.
pub const EXPIRATION_UNSET: i64 = -1;

/// Out-of-band expiration of the immediate slot.
pub const EXPIRATION_IMMEDIATE: i64 = -2;

/// Metadata of the slot a task was last placed in, captured at insertion.
///
/// Read after a flush to decide run-now versus reinsert without going back
/// to a slot that may already hold a different round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSnapshot {
    pub level: usize,
    pub expiration_ms: i64,
}

impl SlotSnapshot {
    pub const UNSET: Self = Self {
        level: 0,
        expiration_ms: EXPIRATION_UNSET,
    };

    pub const IMMEDIATE: Self = Self {
        level: 0,
        expiration_ms: EXPIRATION_IMMEDIATE,
    };

    pub fn is_immediate(&self) -> bool {
        self.expiration_ms == EXPIRATION_IMMEDIATE
    }
}

/// Where a task currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotLink {
    /// Not enqueued anywhere.
    Detached,
    /// Routed to the immediate slot; runs on the next opportunity.
    Immediate,
    /// Linked into `node` of slot `index` on wheel `level`.
    Linked {
        level: usize,
        index: usize,
        node: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct Placement {
    link: SlotLink,
    previous: SlotSnapshot,
}

/// Once versus repeated, with the repeat schedule carried inline.
pub enum TaskKind {
    Once,
    Repeated(Mutex<Scheduler>),
}

/// A unit of deferred work.
///
/// Placement is only written by the timer's event worker. The cancelled flag
/// flips false to true exactly once and may be set from any thread.
pub struct Task {
    id: JobId,
    expired_ms: AtomicI64,
    job: Job,
    kind: TaskKind,
    cancelled: AtomicBool,
    placement: Mutex<Placement>,
}

impl Task {
    pub fn once(id: impl Into<JobId>, expired_ms: i64, job: Job) -> Self {
        Self::with_kind(id.into(), expired_ms, job, TaskKind::Once)
    }

    pub fn repeated(id: impl Into<JobId>, expired_ms: i64, job: Job, scheduler: Scheduler) -> Self {
        Self::with_kind(
            id.into(),
            expired_ms,
            job,
            TaskKind::Repeated(Mutex::new(scheduler)),
        )
    }

    pub fn builder() -> TaskBuilder {
        TaskBuilder::default()
    }

    fn with_kind(id: JobId, expired_ms: i64, job: Job, kind: TaskKind) -> Self {
        Self {
            id,
            expired_ms: AtomicI64::new(expired_ms),
            job,
            kind,
            cancelled: AtomicBool::new(false),
            placement: Mutex::new(Placement {
                link: SlotLink::Detached,
                previous: SlotSnapshot::UNSET,
            }),
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Absolute deadline in epoch milliseconds.
    pub fn expired_ms(&self) -> i64 {
        self.expired_ms.load(Ordering::Acquire)
    }

    pub(crate) fn set_expired_ms(&self, expired_ms: i64) {
        self.expired_ms.store(expired_ms, Ordering::Release);
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    pub fn job_kind(&self) -> JobKind {
        match self.kind {
            TaskKind::Once => JobKind::Once,
            TaskKind::Repeated(_) => JobKind::Repeated,
        }
    }

    /// Runs left after the pending one: `0` for once tasks, `-1` for infinite.
    pub fn rest_loop_count(&self) -> i64 {
        match &self.kind {
            TaskKind::Once => 0,
            TaskKind::Repeated(scheduler) => scheduler.lock().rest_loop_count(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Flip the cancelled flag. Returns `true` only for the call that flipped it.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }

    pub fn link(&self) -> SlotLink {
        self.placement.lock().link
    }

    /// Snapshot of the slot this task was last added to.
    pub fn previous_slot(&self) -> SlotSnapshot {
        self.placement.lock().previous
    }

    pub(crate) fn attach(&self, link: SlotLink, snapshot: SlotSnapshot) {
        let mut placement = self.placement.lock();
        placement.link = link;
        placement.previous = snapshot;
    }

    pub(crate) fn detach(&self) {
        self.placement.lock().link = SlotLink::Detached;
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("expired_ms", &self.expired_ms())
            .field("kind", &self.job_kind())
            .field("cancelled", &self.is_cancelled())
            .field("link", &self.link())
            .finish_non_exhaustive()
    }
}

/// Validating constructor for caller-built tasks.
#[derive(Default)]
pub struct TaskBuilder {
    id: Option<JobId>,
    expired_ms: i64,
    job: Option<Job>,
    scheduler: Option<Scheduler>,
}

impl TaskBuilder {
    pub fn id(mut self, id: impl Into<JobId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn expires_at_ms(mut self, expired_ms: i64) -> Self {
        self.expired_ms = expired_ms;
        self
    }

    pub fn job(mut self, job: Job) -> Self {
        self.job = Some(job);
        self
    }

    /// Make the task repeat on `scheduler` after its first run.
    pub fn scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn build(self) -> Result<Task, TimerError> {
        let id = self.id.filter(|id| !id.is_empty()).ok_or(TimerError::EmptyJobId)?;
        let job = self.job.ok_or(TimerError::EmptyJob)?;
        Ok(match self.scheduler {
            Some(scheduler) => Task::repeated(id, self.expired_ms, job, scheduler),
            None => Task::once(id, self.expired_ms, job),
        })
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the timer

use thiserror::Error;
use tw_core::JobId;

/// Errors surfaced by the timer and its wheel.
///
/// [`TimerError::TaskIsExpired`] is informational: the wheel returns it for a
/// deadline closer than one tick, and the event worker turns it into an
/// immediate run. Callers never see it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("timer is stopped")]
    Stopped,
    #[error("task not found: {0}")]
    TaskNotFound(JobId),
    #[error("job id is empty")]
    EmptyJobId,
    #[error("job body is missing")]
    EmptyJob,
    #[error("task has already expired")]
    TaskIsExpired,
    #[error("expiration of {delay_ms}ms is shorter than one tick ({tick_ms}ms)")]
    TaskTooShortExpiration { delay_ms: u64, tick_ms: u64 },
    #[error("scheduler yields no delays")]
    UnknownScheduler,
    #[error("task is cancelled: {0}")]
    TaskCancelled(JobId),
    #[error("duplicate job id: {0}")]
    DuplicateJobId(JobId),
    #[error("timer must be started inside a tokio runtime")]
    NoRuntime,
}

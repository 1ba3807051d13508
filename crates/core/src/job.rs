// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identifier and job body types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

crate::define_id! {
    /// Unique identifier for a scheduled job.
    ///
    /// Either supplied by the caller or rendered from an [`IdGen`](crate::IdGen)
    /// value. Used as the key for cancellation.
    pub struct JobId;
}

/// The body of a job. Shared so a repeated job can run many times.
pub type Job = Arc<dyn Fn() + Send + Sync>;

/// Wrap a closure as a [`Job`].
pub fn job(f: impl Fn() + Send + Sync + 'static) -> Job {
    Arc::new(f)
}

/// Whether a job runs once or on a repeating schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Once,
    Repeated,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Once => write!(f, "once"),
            JobKind::Repeated => write!(f, "repeated"),
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;

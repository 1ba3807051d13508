// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events consumed by the timer's event worker.

use crate::task::Task;
use crate::wheel::SlotKey;
use std::sync::Arc;

/// Everything that mutates the wheel arrives as one of these.
#[derive(Debug)]
pub(crate) enum Event {
    /// A caller scheduled a new task.
    Add(Arc<Task>),
    /// A flushed task that is not due yet, or the next run of a repeat.
    Readd(Arc<Task>),
    Cancel(Arc<Task>),
    /// The delay queue released one round of a bucket.
    Expired(SlotKey),
}

impl Event {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Event::Add(_) => "add",
            Event::Readd(_) => "readd",
            Event::Cancel(_) => "cancel",
            Event::Expired(_) => "expired",
        }
    }
}

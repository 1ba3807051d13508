// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the engine crate.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tw_core::{job, Job};

/// Poll `cond` every 5ms for up to two seconds.
pub(crate) async fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..400 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

/// Shared run counter for job bodies.
#[derive(Clone, Default)]
pub(crate) struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub(crate) fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    /// A closure that bumps the counter.
    pub(crate) fn func(&self) -> impl Fn() + Send + Sync + 'static {
        let count = Arc::clone(&self.0);
        move || {
            count.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub(crate) fn job(&self) -> Job {
        job(self.func())
    }

    /// Wait until the count reaches `expected`, then make sure it stays there.
    pub(crate) async fn settles_at(&self, expected: usize) -> bool {
        let reached = wait_for(|| self.get() >= expected).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        reached && self.get() == expected
    }
}

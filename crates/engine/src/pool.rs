// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded worker pool for job bodies.
//!
//! `size` workers share one bounded queue. Each job runs on tokio's blocking
//! pool, so a slow or blocking job body never stalls the timer's loops. A job
//! that panics is logged and counted; it is not retried and its worker keeps
//! serving.

use parking_lot::{Mutex, RwLock};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, error};

pub type PoolJob = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("worker pool is released")]
    Closed,
    #[error("worker pool queue is full")]
    Overloaded,
}

#[derive(Default)]
struct Gauges {
    running: AtomicUsize,
    waiting: AtomicUsize,
    panicked: AtomicU64,
}

pub struct WorkerPool {
    tx: RwLock<Option<mpsc::Sender<PoolJob>>>,
    gauges: Arc<Gauges>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    size: usize,
}

impl WorkerPool {
    /// Spawn `size` workers on `handle` behind a queue of `queue_size` jobs.
    pub fn spawn(handle: &Handle, size: usize, queue_size: usize) -> Self {
        let size = size.max(1);
        let (tx, rx) = mpsc::channel::<PoolJob>(queue_size.max(1));
        let rx = Arc::new(AsyncMutex::new(rx));
        let gauges = Arc::new(Gauges::default());

        let workers = (0..size)
            .map(|worker| {
                let rx = Arc::clone(&rx);
                let gauges = Arc::clone(&gauges);
                handle.spawn(work(worker, rx, gauges))
            })
            .collect();

        Self {
            tx: RwLock::new(Some(tx)),
            gauges,
            workers: Mutex::new(workers),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Queue `job` without waiting.
    pub fn submit(&self, job: PoolJob) -> Result<(), PoolError> {
        self.try_submit(job).map_err(|(e, _)| e)
    }

    /// Queue `job` without waiting, handing it back if it was not queued.
    pub fn try_submit(&self, job: PoolJob) -> Result<(), (PoolError, PoolJob)> {
        let Some(tx) = self.sender() else {
            return Err((PoolError::Closed, job));
        };
        self.gauges.waiting.fetch_add(1, Ordering::AcqRel);
        tx.try_send(job).map_err(|e| {
            self.gauges.waiting.fetch_sub(1, Ordering::AcqRel);
            match e {
                mpsc::error::TrySendError::Full(job) => (PoolError::Overloaded, job),
                mpsc::error::TrySendError::Closed(job) => (PoolError::Closed, job),
            }
        })
    }

    /// Wait until the queue has room for one more job.
    ///
    /// Cancel safe: dropping the future gives up nothing but its place in
    /// line.
    pub async fn reserve(&self) -> Result<PoolSlot, PoolError> {
        let tx = self.sender().ok_or(PoolError::Closed)?;
        let permit = tx.reserve_owned().await.map_err(|_| PoolError::Closed)?;
        Ok(PoolSlot {
            permit,
            gauges: Arc::clone(&self.gauges),
        })
    }

    fn sender(&self) -> Option<mpsc::Sender<PoolJob>> {
        self.tx.read().as_ref().cloned()
    }

    /// Stop accepting jobs. Queued jobs still run. Returns `true` for the
    /// call that released the pool.
    pub fn release(&self) -> bool {
        let released = self.tx.write().take().is_some();
        if released {
            debug!(workers = self.size, "worker pool released");
        }
        released
    }

    pub fn is_released(&self) -> bool {
        self.tx.read().is_none()
    }

    /// Jobs executing right now.
    pub fn running(&self) -> usize {
        self.gauges.running.load(Ordering::Acquire)
    }

    /// Jobs queued but not started.
    pub fn waiting(&self) -> usize {
        self.gauges.waiting.load(Ordering::Acquire)
    }

    pub fn panicked(&self) -> u64 {
        self.gauges.panicked.load(Ordering::Acquire)
    }

    /// Release and wait for every worker to drain the queue and exit.
    pub async fn join(&self) {
        self.release();
        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for worker in workers {
            let _ = worker.await;
        }
    }
}

/// Room for one job, held until [`PoolSlot::submit`] fills it.
pub struct PoolSlot {
    permit: mpsc::OwnedPermit<PoolJob>,
    gauges: Arc<Gauges>,
}

impl PoolSlot {
    pub fn submit(self, job: PoolJob) {
        self.gauges.waiting.fetch_add(1, Ordering::AcqRel);
        // The permit hands back its sender; this slot has no further use for it.
        drop(self.permit.send(job));
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.release();
    }
}

async fn work(worker: usize, rx: Arc<AsyncMutex<mpsc::Receiver<PoolJob>>>, gauges: Arc<Gauges>) {
    loop {
        let job = rx.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };
        gauges.waiting.fetch_sub(1, Ordering::AcqRel);
        gauges.running.fetch_add(1, Ordering::AcqRel);

        let outcome = tokio::task::spawn_blocking(move || catch_unwind(AssertUnwindSafe(job))).await;

        gauges.running.fetch_sub(1, Ordering::AcqRel);
        if !matches!(outcome, Ok(Ok(()))) {
            gauges.panicked.fetch_add(1, Ordering::AcqRel);
            error!(worker, "job panicked");
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;

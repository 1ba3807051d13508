// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blocking queue that releases items only once their expiration has passed.
//!
//! A single poller drains due items into a channel. When nothing is due it
//! parks: indefinitely on an empty queue, otherwise on one armed timer for
//! the earliest expiration. An offer that becomes the new earliest item wakes
//! the parked poller so it can re-arm for the closer deadline.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio::time::{sleep, Instant};
use tw_core::{Clock, PriorityQueue, SharedPriorityQueue};

/// Why [`DelayQueue::poll_to_chan`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollExit {
    /// The shutdown signal fired (or its sender went away).
    Shutdown,
    /// The sink was closed; nobody is left to receive due items.
    SinkClosed,
}

enum Next<T> {
    Empty,
    Wait { deadline_ms: i64, delta_ms: i64 },
    Due(T),
}

pub struct DelayQueue<T> {
    queue: SharedPriorityQueue<T>,
    len: AtomicUsize,
    sleeping: AtomicBool,
    wake_tx: mpsc::Sender<()>,
    // Holding this lock is what makes a poller the only poller.
    wake_rx: AsyncMutex<mpsc::Receiver<()>>,
}

impl<T: Send> DelayQueue<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (wake_tx, wake_rx) = mpsc::channel(1);
        Self {
            queue: SharedPriorityQueue::new(PriorityQueue::with_capacity(capacity)),
            len: AtomicUsize::new(0),
            sleeping: AtomicBool::new(false),
            wake_tx,
            wake_rx: AsyncMutex::new(wake_rx),
        }
    }

    /// Items offered and still waiting on the heap.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expiration of the earliest pending item.
    pub fn peek_expiration(&self) -> Option<i64> {
        self.queue.peek_priority()
    }

    /// Queue `value` for release at `expiration_ms`.
    pub fn offer(&self, value: T, expiration_ms: i64) {
        let index = self.queue.push(value, expiration_ms);
        self.len.fetch_add(1, Ordering::AcqRel);

        if index == 0
            && self
                .sleeping
                .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            // Full channel means a wake is already pending.
            let _ = self.wake_tx.try_send(());
        }
    }

    /// Take the earliest item if it is due at `now_ms`, without waiting.
    pub fn try_poll(&self, now_ms: i64) -> Option<T> {
        let mut queue = self.queue.lock();
        if queue.peek()?.priority > now_ms {
            return None;
        }
        let item = queue.pop()?;
        self.len.fetch_sub(1, Ordering::AcqRel);
        Some(item.value)
    }

    fn next(&self, now_ms: i64) -> Next<T> {
        let mut queue = self.queue.lock();
        let next = match queue.peek() {
            None => Next::Empty,
            Some(item) if item.priority > now_ms => Next::Wait {
                deadline_ms: item.priority,
                delta_ms: item.priority - now_ms,
            },
            Some(_) => match queue.pop() {
                Some(item) => {
                    // Off the heap means no longer pending, even if the send
                    // that follows is abandoned.
                    self.len.fetch_sub(1, Ordering::AcqRel);
                    Next::Due(item.value)
                }
                None => Next::Empty,
            },
        };
        // Published under the heap lock: an offer that lands after this
        // point is guaranteed to see the poller asleep and wake it.
        if !matches!(next, Next::Due(_)) {
            self.sleeping.store(true, Ordering::Release);
        }
        next
    }

    /// Deliver due items to `sink` until shutdown or until `sink` closes.
    ///
    /// Only one poller runs at a time; a second caller waits for the first
    /// to return.
    pub async fn poll_to_chan<C: Clock>(
        &self,
        clock: &C,
        sink: &mpsc::Sender<T>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> PollExit {
        let mut wake_rx = self.wake_rx.lock().await;

        let timer = sleep(Duration::ZERO);
        tokio::pin!(timer);
        let mut armed_for: Option<i64> = None;

        loop {
            if *shutdown.borrow() {
                return PollExit::Shutdown;
            }

            match self.next(clock.epoch_ms() as i64) {
                Next::Due(value) => {
                    tokio::select! {
                        biased;
                        _ = shutdown.changed() => return PollExit::Shutdown,
                        sent = sink.send(value) => {
                            if sent.is_err() {
                                return PollExit::SinkClosed;
                            }
                        }
                    }
                }
                Next::Empty => {
                    tokio::select! {
                        biased;
                        _ = shutdown.changed() => return PollExit::Shutdown,
                        _ = wake_rx.recv() => {}
                    }
                    self.sleeping.store(false, Ordering::Release);
                }
                Next::Wait {
                    deadline_ms,
                    delta_ms,
                } => {
                    if armed_for != Some(deadline_ms) {
                        let delta = Duration::from_millis(delta_ms.max(0) as u64);
                        timer.as_mut().reset(Instant::now() + delta);
                        armed_for = Some(deadline_ms);
                    }
                    tokio::select! {
                        biased;
                        _ = shutdown.changed() => return PollExit::Shutdown,
                        _ = wake_rx.recv() => {}
                        _ = &mut timer => armed_for = None,
                    }
                    self.sleeping.store(false, Ordering::Release);
                }
            }
        }
    }
}

impl<T: Send> Default for DelayQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "delay_queue_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Closable point-to-point event channel.
//!
//! Any number of producers hold the [`EventBus`]; a single [`EventReader`]
//! drains it. Closing drops the bus's sender so the reader sees the end of
//! the stream once buffered events are consumed. Close is idempotent and safe
//! to race against senders.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("event bus is closed")]
    Closed,
    #[error("event bus is full")]
    Full,
}

pub struct EventBus<T> {
    tx: RwLock<Option<mpsc::Sender<T>>>,
    closed: AtomicBool,
}

/// Receiving end of the event bus.
pub struct EventReader<T> {
    rx: mpsc::Receiver<T>,
}

impl<T: Send> EventBus<T> {
    /// Create a bus buffering up to `capacity` events.
    ///
    /// Returns both the bus (for sending) and reader (for receiving).
    pub fn new(capacity: usize) -> (Self, EventReader<T>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx: RwLock::new(Some(tx)),
                closed: AtomicBool::new(false),
            },
            EventReader { rx },
        )
    }

    fn sender(&self) -> Result<mpsc::Sender<T>, BusError> {
        self.tx.read().as_ref().cloned().ok_or(BusError::Closed)
    }

    /// Send, waiting for buffer space.
    pub async fn send(&self, event: T) -> Result<(), BusError> {
        let tx = self.sender()?;
        tx.send(event).await.map_err(|_| BusError::Closed)
    }

    /// Send without waiting.
    pub fn try_send(&self, event: T) -> Result<(), BusError> {
        let tx = self.sender()?;
        tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => BusError::Full,
            mpsc::error::TrySendError::Closed(_) => BusError::Closed,
        })
    }

    /// Stop accepting events. Returns `true` for the call that closed it.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.tx.write().take();
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl<T> EventReader<T> {
    /// Wait for the next event.
    ///
    /// Returns `None` once the bus is closed and drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

#[cfg(test)]
#[path = "event_bus_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Array-backed binary heap with caller-supplied ordering.
//!
//! Every [`Item`] records its current position in the backing array, updated
//! on each swap, so an item can be removed from the middle of the heap in
//! O(log n) given its index.

use parking_lot::{Mutex, MutexGuard};
use std::cmp::Ordering;
use std::fmt;

/// A value with a priority and its current heap position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item<T> {
    pub value: T,
    pub priority: i64,
    index: usize,
}

impl<T> Item<T> {
    pub fn new(value: T, priority: i64) -> Self {
        Self {
            value,
            priority,
            index: 0,
        }
    }

    /// Position in the heap array. Only meaningful while the item is queued.
    pub fn index(&self) -> usize {
        self.index
    }
}

type Comparator<T> = Box<dyn Fn(&Item<T>, &Item<T>) -> Ordering + Send + Sync>;

/// Min-heap under the configured comparator: `Less` means "comes out first".
pub struct PriorityQueue<T> {
    items: Vec<Item<T>>,
    /// `None` orders by priority alone and keeps `T` free of lifetime bounds.
    cmp: Option<Comparator<T>>,
}

/// Smaller priority first.
fn by_priority<T>(a: &Item<T>, b: &Item<T>) -> Ordering {
    a.priority.cmp(&b.priority)
}

impl<T> PriorityQueue<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            cmp: None,
        }
    }

    pub fn with_comparator(
        cmp: impl Fn(&Item<T>, &Item<T>) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        Self {
            items: Vec::new(),
            cmp: Some(Box::new(cmp)),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Push a value and return the index it settled at (0 = new root).
    pub fn push(&mut self, value: T, priority: i64) -> usize {
        let index = self.items.len();
        let mut item = Item::new(value, priority);
        item.index = index;
        self.items.push(item);
        self.sift_up(index)
    }

    /// Remove and return the first item, or `None` when empty.
    pub fn pop(&mut self) -> Option<Item<T>> {
        self.remove(0)
    }

    /// The first item without removing it, or `None` when empty.
    pub fn peek(&self) -> Option<&Item<T>> {
        self.items.first()
    }

    /// Remove the item currently at `index`.
    pub fn remove(&mut self, index: usize) -> Option<Item<T>> {
        let last = self.items.len().checked_sub(1)?;
        if index > last {
            return None;
        }
        self.swap(index, last);
        let mut removed = self.items.pop()?;
        removed.index = 0;
        if index < self.items.len() {
            let settled = self.sift_up(index);
            if settled == index {
                self.sift_down(index);
            }
        }
        Some(removed)
    }

    fn less(&self, a: usize, b: usize) -> bool {
        let (a, b) = (&self.items[a], &self.items[b]);
        let ordering = match &self.cmp {
            Some(cmp) => cmp(a, b),
            None => by_priority(a, b),
        };
        ordering == Ordering::Less
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.items.swap(a, b);
        self.items[a].index = a;
        self.items[b].index = b;
    }

    fn sift_up(&mut self, mut index: usize) -> usize {
        while index > 0 {
            let parent = (index - 1) / 2;
            if !self.less(index, parent) {
                break;
            }
            self.swap(index, parent);
            index = parent;
        }
        index
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * index + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.less(right, left) {
                right
            } else {
                left
            };
            if !self.less(child, index) {
                break;
            }
            self.swap(index, child);
            index = child;
        }
    }
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for PriorityQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityQueue")
            .field("items", &self.items)
            .finish_non_exhaustive()
    }
}

/// Thread-safe variant: one lock held across each whole operation.
///
/// Callers that need a compound critical section (peek-then-pop) take the
/// guard with [`SharedPriorityQueue::lock`].
pub struct SharedPriorityQueue<T> {
    inner: Mutex<PriorityQueue<T>>,
}

impl<T> SharedPriorityQueue<T> {
    pub fn new(queue: PriorityQueue<T>) -> Self {
        Self {
            inner: Mutex::new(queue),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, PriorityQueue<T>> {
        self.inner.lock()
    }

    pub fn push(&self, value: T, priority: i64) -> usize {
        self.inner.lock().push(value, priority)
    }

    pub fn pop(&self) -> Option<Item<T>> {
        self.inner.lock().pop()
    }

    /// Priority of the first item, if any.
    pub fn peek_priority(&self) -> Option<i64> {
        self.inner.lock().peek().map(|item| item.priority)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl<T> Default for SharedPriorityQueue<T> {
    fn default() -> Self {
        Self::new(PriorityQueue::new())
    }
}

#[cfg(test)]
#[path = "priority_queue_tests.rs"]
mod tests;

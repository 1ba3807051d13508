// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wheel buckets.
//!
//! A slot is a reusable cell: as time advances the same array index is handed
//! to successive tick-aligned rounds. `expiration_ms` names the round the slot
//! currently holds. Tasks are kept in an index-linked list so a cancelled task
//! can be unlinked in O(1) from the node index it carries.

use crate::task::{SlotLink, SlotSnapshot, Task, EXPIRATION_UNSET};
use std::sync::Arc;

#[derive(Debug)]
struct Node {
    task: Option<Arc<Task>>,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Doubly linked list over a node arena with a free list.
#[derive(Debug, Default)]
struct TaskList {
    nodes: Vec<Node>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl TaskList {
    fn push_back(&mut self, task: Arc<Task>) -> usize {
        let node = Node {
            task: Some(task),
            prev: self.tail,
            next: None,
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.nodes[index] = node;
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;
        index
    }

    /// Unlink `index` if it still holds `task`.
    fn unlink(&mut self, index: usize, task: &Task) -> bool {
        let holds = self
            .nodes
            .get(index)
            .and_then(|node| node.task.as_deref())
            .is_some_and(|held| std::ptr::eq(held, task));
        if !holds {
            return false;
        }

        let (prev, next) = (self.nodes[index].prev, self.nodes[index].next);
        match prev {
            Some(prev) => self.nodes[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.nodes[next].prev = prev,
            None => self.tail = prev,
        }
        let node = &mut self.nodes[index];
        node.task = None;
        node.prev = None;
        node.next = None;
        self.free.push(index);
        self.len -= 1;
        true
    }

    /// Take every task in list order, leaving the list empty.
    fn drain(&mut self) -> Vec<Arc<Task>> {
        let mut tasks = Vec::with_capacity(self.len);
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let node = &mut self.nodes[index];
            cursor = node.next;
            if let Some(task) = node.task.take() {
                tasks.push(task);
            }
        }
        self.nodes.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
        tasks
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Open,
    Flushed,
}

/// One bucket of a wheel level.
#[derive(Debug)]
pub struct Slot {
    id: usize,
    level: usize,
    expiration_ms: i64,
    state: SlotState,
    tasks: TaskList,
}

impl Slot {
    pub fn new(id: usize, level: usize) -> Self {
        Self {
            id,
            level,
            expiration_ms: EXPIRATION_UNSET,
            state: SlotState::Open,
            tasks: TaskList::default(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn expiration_ms(&self) -> i64 {
        self.expiration_ms
    }

    pub fn len(&self) -> usize {
        self.tasks.len
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.len == 0
    }

    pub fn is_flushed(&self) -> bool {
        self.state == SlotState::Flushed
    }

    pub fn snapshot(&self) -> SlotSnapshot {
        SlotSnapshot {
            level: self.level,
            expiration_ms: self.expiration_ms,
        }
    }

    /// Assign the slot to a round. Returns `true` when the round changed,
    /// which is the caller's cue to register the slot with the delay queue.
    pub fn set_expiration(&mut self, expiration_ms: i64) -> bool {
        if self.expiration_ms == expiration_ms {
            return false;
        }
        self.expiration_ms = expiration_ms;
        self.state = SlotState::Open;
        true
    }

    /// Mark the slot unused.
    pub fn reset(&mut self) {
        self.expiration_ms = EXPIRATION_UNSET;
    }

    /// Append `task`, stamping it with a link and a snapshot of this slot.
    /// No-op once the current round has been flushed.
    pub fn add_task(&mut self, task: &Arc<Task>) -> bool {
        if self.is_flushed() {
            return false;
        }
        let node = self.tasks.push_back(Arc::clone(task));
        task.attach(
            SlotLink::Linked {
                level: self.level,
                index: self.id,
                node,
            },
            self.snapshot(),
        );
        true
    }

    /// Unlink `task` if it is linked here. No-op once flushed.
    pub fn remove_task(&mut self, task: &Task) -> bool {
        if self.is_flushed() {
            return false;
        }
        let SlotLink::Linked { level, index, node } = task.link() else {
            return false;
        };
        if level != self.level || index != self.id {
            return false;
        }
        let removed = self.tasks.unlink(node, task);
        if removed {
            task.detach();
        }
        removed
    }

    /// Detach every task in insertion order and hand it to `reinsert`.
    ///
    /// The slot does not decide whether a task runs or moves; that belongs to
    /// the caller.
    pub fn flush(&mut self, mut reinsert: impl FnMut(Arc<Task>)) {
        self.state = SlotState::Flushed;
        for task in self.tasks.drain() {
            task.detach();
            reinsert(task);
        }
    }
}

#[cfg(test)]
#[path = "slot_tests.rs"]
mod tests;

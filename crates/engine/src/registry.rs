// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JobId to task lookup, used for cancellation.

use crate::error::TimerError;
use crate::task::Task;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tw_core::JobId;

#[derive(Clone, Default)]
pub(crate) struct Registry {
    tasks: Arc<Mutex<HashMap<JobId, Arc<Task>>>>,
}

impl Registry {
    pub(crate) fn insert(&self, task: Arc<Task>) -> Result<(), TimerError> {
        let mut tasks = self.tasks.lock();
        if tasks.contains_key(task.id()) {
            return Err(TimerError::DuplicateJobId(task.id().clone()));
        }
        tasks.insert(task.id().clone(), task);
        Ok(())
    }

    pub(crate) fn get(&self, id: &JobId) -> Option<Arc<Task>> {
        self.tasks.lock().get(id).cloned()
    }

    /// Remove the entry for `task`'s id only if it still maps to `task`.
    pub(crate) fn remove_if_same(&self, task: &Arc<Task>) -> bool {
        let mut tasks = self.tasks.lock();
        match tasks.get(task.id()) {
            Some(current) if Arc::ptr_eq(current, task) => {
                tasks.remove(task.id());
                true
            }
            _ => false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub(crate) fn clear(&self) {
        self.tasks.lock().clear();
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

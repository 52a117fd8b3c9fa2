// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live worker handles keyed by task

use fm_adapters::{SessionAdapter, WorkerHandle};
use fm_core::TaskId;
use std::collections::HashMap;

/// In-flight invocations owned by the supervisor.
///
/// A task has at most one handle; registering again replaces (and returns)
/// the previous one.
pub struct HandleRegistry<S: SessionAdapter> {
    handles: HashMap<TaskId, WorkerHandle<S>>,
}

impl<S: SessionAdapter> Default for HandleRegistry<S> {
    fn default() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }
}

impl<S: SessionAdapter> HandleRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, task_id: TaskId, handle: WorkerHandle<S>) -> Option<WorkerHandle<S>> {
        self.handles.insert(task_id, handle)
    }

    pub fn get(&self, task_id: &TaskId) -> Option<&WorkerHandle<S>> {
        self.handles.get(task_id)
    }

    pub fn remove(&mut self, task_id: &TaskId) -> Option<WorkerHandle<S>> {
        self.handles.remove(task_id)
    }

    /// Remove the handle only if it is still the one for `run`.
    pub fn remove_run(&mut self, task_id: &TaskId, run: u64) -> Option<WorkerHandle<S>> {
        match self.handles.get(task_id) {
            Some(handle) if handle.run() == run => self.handles.remove(task_id),
            _ => None,
        }
    }

    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.handles.contains_key(task_id)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Remove every handle, for shutdown.
    pub fn drain(&mut self) -> Vec<(TaskId, WorkerHandle<S>)> {
        self.handles.drain().collect()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

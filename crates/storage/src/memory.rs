// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory task store for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::{StoreError, TaskStore};
use fm_core::{Config, Task};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct MemoryState {
    tasks: Vec<Task>,
    config: Config,
    saves: usize,
}

/// Task store that keeps everything in memory.
///
/// Clones share state so a test can inspect what the supervisor saved.
#[derive(Clone, Default)]
pub struct MemoryTaskStore {
    inner: Arc<Mutex<MemoryState>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let store = Self::default();
        store.inner.lock().tasks = tasks;
        store
    }

    pub fn with_config(self, config: Config) -> Self {
        self.inner.lock().config = config;
        self
    }

    /// Tasks as last saved
    pub fn tasks(&self) -> Vec<Task> {
        self.inner.lock().tasks.clone()
    }

    pub fn config(&self) -> Config {
        self.inner.lock().config.clone()
    }

    /// Number of `save_all` calls so far
    pub fn saves(&self) -> usize {
        self.inner.lock().saves
    }
}

impl TaskStore for MemoryTaskStore {
    fn load_all(&mut self) -> Result<Vec<Task>, StoreError> {
        Ok(self.inner.lock().tasks.clone())
    }

    fn save_all(&mut self, tasks: &[Task]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.tasks = tasks.to_vec();
        inner.saves += 1;
        Ok(())
    }

    fn load_config(&mut self) -> Result<Config, StoreError> {
        Ok(self.inner.lock().config.clone())
    }

    fn save_config(&mut self, config: &Config) -> Result<(), StoreError> {
        self.inner.lock().config = config.clone();
        Ok(())
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake change sink for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ChangeSink, NotifyError};
use async_trait::async_trait;
use fm_core::Task;
use parking_lot::Mutex;
use std::sync::Arc;

/// Fake change sink that records every snapshot
#[derive(Clone, Default)]
pub struct FakeChangeSink {
    snapshots: Arc<Mutex<Vec<Vec<Task>>>>,
}

impl FakeChangeSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All snapshots received so far
    pub fn snapshots(&self) -> Vec<Vec<Task>> {
        self.snapshots.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.snapshots.lock().len()
    }

    pub fn last(&self) -> Option<Vec<Task>> {
        self.snapshots.lock().last().cloned()
    }
}

#[async_trait]
impl ChangeSink for FakeChangeSink {
    async fn tasks_changed(&self, tasks: &[Task]) -> Result<(), NotifyError> {
        self.snapshots.lock().push(tasks.to_vec());
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;

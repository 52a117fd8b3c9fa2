// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broadcast change sink.
//!
//! Publishes each snapshot on a tokio broadcast channel so any number of
//! push subscribers (a UI bridge, an HTTP stream) can follow the task list.
//! Having no subscribers is not an error.

use super::{ChangeSink, NotifyError};
use async_trait::async_trait;
use fm_core::Task;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Default number of snapshots a slow subscriber may lag behind.
const DEFAULT_CAPACITY: usize = 64;

#[derive(Clone, Debug)]
pub struct BroadcastChangeSink {
    tx: broadcast::Sender<Arc<Vec<Task>>>,
}

impl Default for BroadcastChangeSink {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl BroadcastChangeSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Vec<Task>>> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl ChangeSink for BroadcastChangeSink {
    async fn tasks_changed(&self, tasks: &[Task]) -> Result<(), NotifyError> {
        match self.tx.send(Arc::new(tasks.to_vec())) {
            Ok(receivers) => tracing::trace!(receivers, tasks = tasks.len(), "snapshot published"),
            Err(_) => tracing::trace!("no change subscribers"),
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "broadcast_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change sinks.
//!
//! The supervisor hands the complete task list to a sink after each
//! mutation it persists. Sinks must not block the supervisor loop.

mod broadcast;

pub use broadcast::BroadcastChangeSink;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeChangeSink;

use async_trait::async_trait;
use fm_core::Task;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Destination for task-list snapshots. A failed push is logged by the
/// caller and never rolls back the mutation.
#[async_trait]
pub trait ChangeSink: Clone + Send + Sync + 'static {
    async fn tasks_changed(&self, tasks: &[Task]) -> Result<(), NotifyError>;
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Detached terminal sessions that outlive the supervisor.
//!
//! A session is addressed by name. Its output reaches the supervisor only
//! through the log file given at spawn time.

mod tmux;

pub use tmux::TmuxAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSession, FakeSessionAdapter, SessionCall};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors from session operations.
///
/// Liveness callers treat [`SessionError::CommandFailed`] as "session gone".
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
}

/// Backend that can host a worker in a named, detached session
#[async_trait]
pub trait SessionAdapter: Clone + Send + Sync + 'static {
    /// Whether the session backend can be used on this host
    async fn is_available(&self) -> bool;

    /// Spawn a new detached session named `name` running `cmd`.
    ///
    /// When `log` is given, everything the session prints is appended to it.
    /// Returns the session id used by the other operations.
    async fn spawn(
        &self,
        name: &str,
        cwd: &Path,
        cmd: &str,
        log: Option<&Path>,
    ) -> Result<String, SessionError>;

    /// Kill a session; killing one that is already gone succeeds.
    async fn kill(&self, id: &str) -> Result<(), SessionError>;

    /// Whether the session still exists. An error means the backend could
    /// not be asked, not that the session is gone.
    async fn is_alive(&self, id: &str) -> Result<bool, SessionError>;
}

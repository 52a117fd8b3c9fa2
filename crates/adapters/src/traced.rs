// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing wrapper for session backends.
//!
//! Every call runs inside a `session.*` span carrying the session name, so
//! daemon logs tie tmux activity back to the task that caused it.

use crate::session::{SessionAdapter, SessionError};
use async_trait::async_trait;
use std::path::Path;
use std::time::Instant;
use tracing::Instrument;

/// Session adapter that logs each call before delegating to `S`
#[derive(Clone)]
pub struct TracedSession<S> {
    inner: S,
}

impl<S> TracedSession<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[async_trait]
impl<S: SessionAdapter> SessionAdapter for TracedSession<S> {
    async fn is_available(&self) -> bool {
        let available = self.inner.is_available().await;
        tracing::debug!(available, "session backend probed");
        available
    }

    async fn spawn(
        &self,
        name: &str,
        cwd: &Path,
        cmd: &str,
        log: Option<&Path>,
    ) -> Result<String, SessionError> {
        let span = tracing::info_span!("session.spawn", session_id = name, cwd = %cwd.display());
        async {
            tracing::info!(cmd, piped = log.is_some(), "starting");
            let start = Instant::now();
            let result = self.inner.spawn(name, cwd, cmd, log).await;
            match &result {
                Ok(_) => tracing::info!(elapsed_ms = elapsed_ms(start), "session created"),
                Err(e) => tracing::error!(elapsed_ms = elapsed_ms(start), error = %e, "spawn failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn kill(&self, id: &str) -> Result<(), SessionError> {
        let span = tracing::info_span!("session.kill", session_id = id);
        async {
            let result = self.inner.kill(id).await;
            match &result {
                Ok(()) => tracing::info!("killed"),
                Err(e) => tracing::warn!(error = %e, "kill failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn is_alive(&self, id: &str) -> Result<bool, SessionError> {
        let span = tracing::trace_span!("session.is_alive", session_id = id);
        async {
            let result = self.inner.is_alive(id).await;
            match &result {
                Ok(alive) => tracing::trace!(alive, "checked"),
                Err(e) => tracing::warn!(error = %e, "liveness query failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux session adapter

use super::{SessionAdapter, SessionError};
use crate::subprocess::tmux;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;

/// Tmux-based session adapter
#[derive(Clone, Default)]
pub struct TmuxAdapter;

impl TmuxAdapter {
    pub fn new() -> Self {
        Self
    }
}

/// Exact-match target so `fm-ab` never resolves to `fm-abc`.
fn exact(id: &str) -> String {
    format!("={id}")
}

/// `new-session` for `cmd`, chained with a `pipe-pane` into `log` so the
/// pipe is attached before the worker prints anything.
fn new_session_args(
    name: &str,
    cwd: &Path,
    cmd: &str,
    log: Option<&Path>,
) -> Result<Vec<OsString>, SessionError> {
    let mut args: Vec<OsString> = ["new-session", "-d", "-s", name, "-c"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(cwd.as_os_str().to_owned());
    args.push(cmd.into());

    if let Some(log) = log {
        let log_path = log.to_string_lossy();
        let quoted = shlex::try_quote(&log_path)
            .map_err(|e| SessionError::SpawnFailed(format!("invalid log path: {e}")))?;
        args.extend([";", "pipe-pane", "-o"].map(OsString::from));
        args.push(format!("cat >> {quoted}").into());
    }
    Ok(args)
}

#[async_trait]
impl SessionAdapter for TmuxAdapter {
    async fn is_available(&self) -> bool {
        match tmux(["-V"]).await {
            Ok(output) => output.status.success(),
            Err(e) => {
                tracing::debug!(error = %e, "tmux unavailable");
                false
            }
        }
    }

    async fn spawn(
        &self,
        name: &str,
        cwd: &Path,
        cmd: &str,
        log: Option<&Path>,
    ) -> Result<String, SessionError> {
        if !cwd.is_dir() {
            return Err(SessionError::SpawnFailed(format!(
                "working directory does not exist: {}",
                cwd.display()
            )));
        }
        let args = new_session_args(name, cwd, cmd, log)?;

        // A leftover session with our name belongs to a run that is over
        if self.is_alive(name).await.unwrap_or(false) {
            tracing::warn!(session_id = name, "replacing leftover session");
            self.kill(name).await?;
        }

        let output = tmux(&args)
            .await
            .map_err(|e| SessionError::SpawnFailed(e.to_string()))?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(SessionError::SpawnFailed(stderr.trim().to_string()));
        }
        if !stderr.trim().is_empty() {
            tracing::warn!(session_id = name, stderr = %stderr.trim(), "tmux spawn stderr (non-fatal)");
        }

        Ok(name.to_string())
    }

    async fn kill(&self, id: &str) -> Result<(), SessionError> {
        // Best effort: the session usually ended on its own
        let target = exact(id);
        if let Err(e) = tmux(["kill-session", "-t", target.as_str()]).await {
            tracing::debug!(session_id = id, error = %e, "kill-session did not run");
        }
        Ok(())
    }

    async fn is_alive(&self, id: &str) -> Result<bool, SessionError> {
        let target = exact(id);
        let output = tmux(["has-session", "-t", target.as_str()])
            .await
            .map_err(|e| SessionError::CommandFailed(e.to_string()))?;
        Ok(output.status.success())
    }
}

#[cfg(test)]
#[path = "tmux_tests.rs"]
mod tests;

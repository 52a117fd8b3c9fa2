// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded execution of short-lived helper commands (tmux queries).
//!
//! Worker processes are long-lived and never go through here.

use std::ffi::OsStr;
use std::process::Output;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Ceiling for any single tmux invocation.
pub const TMUX_TIMEOUT: Duration = Duration::from_secs(10);

/// A helper command that did not produce an exit status
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{what} could not run: {source}")]
    Spawn {
        what: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{what} timed out after {}ms", .after.as_millis())]
    TimedOut { what: String, after: Duration },
}

/// Run `cmd` to completion, killing it if it outlives `timeout`.
///
/// A non-zero exit is not an error here; callers read the status.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    what: &str,
) -> Result<Output, CommandError> {
    cmd.kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(CommandError::Spawn {
            what: what.to_string(),
            source,
        }),
        Err(_) => Err(CommandError::TimedOut {
            what: what.to_string(),
            after: timeout,
        }),
    }
}

/// Run one tmux subcommand under [`TMUX_TIMEOUT`].
///
/// The first argument names the call in errors (`tmux has-session`).
pub async fn tmux<I, S>(args: I) -> Result<Output, CommandError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<S> = args.into_iter().collect();
    let what = match args.first() {
        Some(sub) => format!("tmux {}", sub.as_ref().to_string_lossy()),
        None => "tmux".to_string(),
    };
    let mut cmd = Command::new("tmux");
    cmd.args(&args);
    run_with_timeout(cmd, TMUX_TIMEOUT, &what).await
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker running inside a detached session

use super::{session_name, ScratchPaths, WorkerError};
use crate::session::SessionAdapter;
use fm_core::{Event, TaskId, WorkerCommand};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Shell command run inside the session.
///
/// The prompt is read from `prompt_file` at exec time and passed as one
/// argument; `CLAUDECODE` is unset so the worker does not refuse to start
/// when the supervisor itself runs under it.
pub fn session_command(command: &WorkerCommand, prompt_file: &Path) -> Result<String, WorkerError> {
    let words = std::iter::once(command.program.as_str()).chain(command.args.iter().map(String::as_str));
    let argv = shlex::try_join(words)
        .map_err(|e| WorkerError::SessionCreation(format!("unquotable worker command: {}", e)))?;
    let prompt_path = prompt_file.to_string_lossy();
    let prompt_path = shlex::try_quote(&prompt_path)
        .map_err(|e| WorkerError::SessionCreation(format!("unquotable prompt path: {}", e)))?;
    Ok(format!(
        "exec env -u CLAUDECODE {} \"$(cat {})\"",
        argv, prompt_path
    ))
}

/// Handle for a worker running in a session
pub struct SessionHandle<S: SessionAdapter> {
    sessions: S,
    run: u64,
    session: String,
    paths: ScratchPaths,
    alive: Arc<AtomicBool>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl<S: SessionAdapter> SessionHandle<S> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) async fn start(
        sessions: S,
        task_id: &TaskId,
        run: u64,
        command: &WorkerCommand,
        prompt: &str,
        work_dir: &Path,
        scratch_dir: &Path,
        poll_interval: Duration,
        event_tx: mpsc::Sender<Event>,
    ) -> Result<Self, WorkerError> {
        let name = session_name(task_id);
        let paths = ScratchPaths::new(scratch_dir, task_id);

        tokio::fs::create_dir_all(scratch_dir).await?;
        // A log left from an earlier run must not leak into this one
        paths.remove().await;
        tokio::fs::write(&paths.prompt, prompt).await?;

        let cmd = session_command(command, &paths.prompt)?;
        if let Err(e) = sessions.spawn(&name, work_dir, &cmd, Some(&paths.log)).await {
            paths.remove().await;
            return Err(WorkerError::SessionCreation(e.to_string()));
        }

        Ok(Self::watch(
            sessions,
            task_id.clone(),
            run,
            name,
            paths,
            poll_interval,
            event_tx,
        ))
    }

    /// Start polling an existing session.
    pub(crate) fn watch(
        sessions: S,
        task_id: TaskId,
        run: u64,
        session: String,
        paths: ScratchPaths,
        poll_interval: Duration,
        event_tx: mpsc::Sender<Event>,
    ) -> Self {
        let alive = Arc::new(AtomicBool::new(true));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(poll_session(
            sessions.clone(),
            session.clone(),
            task_id,
            run,
            poll_interval,
            Arc::clone(&alive),
            event_tx,
            shutdown_rx,
        ));

        Self {
            sessions,
            run,
            session,
            paths,
            alive,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn run(&self) -> u64 {
        self.run
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    /// Result of the most recent poll
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Ask the session backend directly, bypassing the poll.
    pub async fn query_alive(&self) -> bool {
        match self.sessions.is_alive(&self.session).await {
            Ok(alive) => alive,
            Err(e) => {
                tracing::warn!(session_id = %self.session, error = %e, "liveness query failed, treating as gone");
                false
            }
        }
    }

    /// The session log so far, verbatim; empty if none yet.
    pub async fn capture_output(&self) -> String {
        self.paths.read_log().await.unwrap_or_default()
    }

    pub async fn terminate(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.alive.store(false, Ordering::SeqCst);
        let _ = self.sessions.kill(&self.session).await;
        self.paths.remove().await;
    }
}

#[allow(clippy::too_many_arguments)]
async fn poll_session<S: SessionAdapter>(
    sessions: S,
    session: String,
    task_id: TaskId,
    run: u64,
    interval: Duration,
    alive: Arc<AtomicBool>,
    event_tx: mpsc::Sender<Event>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            // Fires on terminate and when the handle is dropped
            _ = &mut shutdown_rx => break,
            _ = tokio::time::sleep(interval) => {
                let still_alive = match sessions.is_alive(&session).await {
                    Ok(alive) => alive,
                    Err(e) => {
                        tracing::warn!(%task_id, session_id = %session, error = %e, "liveness query failed, treating as gone");
                        false
                    }
                };
                if !still_alive {
                    alive.store(false, Ordering::SeqCst);
                    tracing::info!(%task_id, session_id = %session, run, "session ended");
                    if event_tx.send(Event::SessionEnded { task_id: task_id.clone(), run }).await.is_err() {
                        tracing::debug!("event channel closed, dropping session end");
                    }
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;

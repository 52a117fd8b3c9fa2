// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker handles: one in-flight invocation of the worker CLI.
//!
//! Two backends exist. The process backend runs the worker as a direct
//! child with piped output; it cannot outlive the supervisor. The session
//! backend runs it inside a detached tmux session whose output is piped to
//! a log file, so a restarted supervisor can reattach by name. The backend
//! is chosen once per process by [`WorkerLauncher::detect`].

mod process;
mod session;

pub use process::ProcessHandle;
pub use session::{session_command, SessionHandle};

use crate::session::SessionAdapter;
use fm_core::{Event, TaskId, WorkerCommand, WorkerRef};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from starting a worker
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to spawn worker: {0}")]
    Dispatch(String),
    #[error("failed to create session: {0}")]
    SessionCreation(String),
    #[error("scratch file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which kind of handle the launcher produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Process,
    Session,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Process => write!(f, "process"),
            Backend::Session => write!(f, "session"),
        }
    }
}

/// Tmux session name for a task. Deterministic so restarts can find it.
pub fn session_name(task_id: &TaskId) -> String {
    format!("fm-{}", task_id)
}

/// Prompt and log files backing a session-run task
#[derive(Debug, Clone)]
pub struct ScratchPaths {
    pub prompt: PathBuf,
    pub log: PathBuf,
}

impl ScratchPaths {
    pub fn new(scratch_dir: &Path, task_id: &TaskId) -> Self {
        let name = session_name(task_id);
        Self {
            prompt: scratch_dir.join(format!("{}.prompt", name)),
            log: scratch_dir.join(format!("{}.log", name)),
        }
    }

    /// Read the log, `None` if it does not exist.
    pub async fn read_log(&self) -> Option<String> {
        match tokio::fs::read(&self.log).await {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %self.log.display(), error = %e, "failed to read session log");
                None
            }
        }
    }

    /// Delete both files; missing files are fine.
    pub async fn remove(&self) {
        for path in [&self.prompt, &self.log] {
            if let Err(e) = tokio::fs::remove_file(path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove scratch file");
                }
            }
        }
    }
}

/// Supervisor-side object for one in-flight invocation
pub enum WorkerHandle<S: SessionAdapter> {
    Process(ProcessHandle),
    Session(SessionHandle<S>),
}

impl<S: SessionAdapter> WorkerHandle<S> {
    pub fn run(&self) -> u64 {
        match self {
            WorkerHandle::Process(h) => h.run(),
            WorkerHandle::Session(h) => h.run(),
        }
    }

    pub fn worker_ref(&self) -> WorkerRef {
        match self {
            WorkerHandle::Process(h) => WorkerRef::Process {
                run: h.run(),
                pid: h.pid(),
            },
            WorkerHandle::Session(h) => WorkerRef::Session {
                run: h.run(),
                session: h.session().to_string(),
            },
        }
    }

    pub fn is_alive(&self) -> bool {
        match self {
            WorkerHandle::Process(h) => h.is_alive(),
            WorkerHandle::Session(h) => h.is_alive(),
        }
    }

    /// Raw output produced so far (unsanitized).
    pub async fn capture_output(&self) -> String {
        match self {
            WorkerHandle::Process(h) => h.capture_output(),
            WorkerHandle::Session(h) => h.capture_output().await,
        }
    }

    pub async fn terminate(self) {
        match self {
            WorkerHandle::Process(h) => h.terminate(),
            WorkerHandle::Session(h) => h.terminate().await,
        }
    }
}

/// Outcome of looking for a worker that was running before a restart
pub enum Recovery<S: SessionAdapter> {
    /// The session is still running; polling resumed
    Reattached(WorkerHandle<S>),
    /// The session is gone; its log if one survived
    Ended { log: Option<String> },
    /// The backend cannot outlive the supervisor
    Unsupported,
}

/// Starts worker handles on the backend chosen at startup
pub struct WorkerLauncher<S: SessionAdapter> {
    backend: Backend,
    sessions: S,
    scratch_dir: PathBuf,
    poll_interval: Duration,
    next_run: AtomicU64,
    event_tx: mpsc::Sender<Event>,
}

impl<S: SessionAdapter> WorkerLauncher<S> {
    pub fn new(
        backend: Backend,
        sessions: S,
        scratch_dir: impl Into<PathBuf>,
        event_tx: mpsc::Sender<Event>,
    ) -> Self {
        Self {
            backend,
            sessions,
            scratch_dir: scratch_dir.into(),
            poll_interval: crate::env::session_poll_ms(),
            next_run: AtomicU64::new(1),
            event_tx,
        }
    }

    /// Pick the session backend when the session tool is usable, else the
    /// process backend.
    pub async fn detect(
        sessions: S,
        scratch_dir: impl Into<PathBuf>,
        event_tx: mpsc::Sender<Event>,
    ) -> Self {
        let backend = if sessions.is_available().await {
            Backend::Session
        } else {
            Backend::Process
        };
        tracing::info!(%backend, "worker backend selected");
        Self::new(backend, sessions, scratch_dir, event_tx)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    fn next_run(&self) -> u64 {
        self.next_run.fetch_add(1, Ordering::Relaxed)
    }

    /// Launch the worker for `task_id` with `prompt` in `work_dir`.
    pub async fn start(
        &self,
        task_id: &TaskId,
        prompt: &str,
        work_dir: &Path,
        command: &WorkerCommand,
    ) -> Result<WorkerHandle<S>, WorkerError> {
        let run = self.next_run();
        match self.backend {
            Backend::Process => ProcessHandle::spawn(
                task_id,
                run,
                command,
                prompt,
                work_dir,
                self.event_tx.clone(),
            )
            .map(WorkerHandle::Process),
            Backend::Session => SessionHandle::start(
                self.sessions.clone(),
                task_id,
                run,
                command,
                prompt,
                work_dir,
                &self.scratch_dir,
                self.poll_interval,
                self.event_tx.clone(),
            )
            .await
            .map(WorkerHandle::Session),
        }
    }

    /// Find the worker a previous supervisor left running for `task_id`.
    pub async fn recover(&self, task_id: &TaskId) -> Recovery<S> {
        if self.backend == Backend::Process {
            return Recovery::Unsupported;
        }

        let name = session_name(task_id);
        let paths = ScratchPaths::new(&self.scratch_dir, task_id);
        let alive = match self.sessions.is_alive(&name).await {
            Ok(alive) => alive,
            Err(e) => {
                tracing::warn!(%task_id, session_id = %name, error = %e, "liveness query failed, treating as gone");
                false
            }
        };

        if alive {
            let run = self.next_run();
            tracing::info!(%task_id, session_id = %name, run, "reattached to session");
            let handle = SessionHandle::watch(
                self.sessions.clone(),
                task_id.clone(),
                run,
                name,
                paths,
                self.poll_interval,
                self.event_tx.clone(),
            );
            return Recovery::Reattached(WorkerHandle::Session(handle));
        }

        let log = paths.read_log().await;
        paths.remove().await;
        tracing::info!(%task_id, session_id = %name, has_log = log.is_some(), "session ended while unsupervised");
        Recovery::Ended { log }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

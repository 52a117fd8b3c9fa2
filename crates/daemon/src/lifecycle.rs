// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

use std::fs::File;
use std::path::{Path, PathBuf};

use fm_adapters::{BroadcastChangeSink, TmuxAdapter, TracedSession, WorkerLauncher};
use fm_core::{Event, SystemClock, UuidIdGen};
use fm_engine::{Supervisor, SupervisorDeps, SupervisorError};
use fm_storage::{JsonTaskStore, StoreError};
use fs2::FileExt;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

/// Supervisor with concrete adapter types (sessions wrapped with tracing)
pub type DaemonSupervisor = Supervisor<
    TracedSession<TmuxAdapter>,
    JsonTaskStore,
    BroadcastChangeSink,
    SystemClock,
    UuidIdGen,
>;

/// Worker events buffered between loop iterations
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Daemon file layout
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root state directory (e.g. ~/.local/state/foreman)
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Prompt and pane-log files of session workers
    pub scratch_path: PathBuf,
}

impl Paths {
    /// Resolve paths from the environment.
    pub fn load() -> Result<Self, LifecycleError> {
        Ok(Self::under(crate::env::state_dir()?))
    }

    pub fn under(state_dir: PathBuf) -> Self {
        Self {
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            scratch_path: state_dir.join("scratch"),
            state_dir,
        }
    }
}

/// Running daemon: the supervisor plus the lock that makes it exclusive.
pub struct Daemon {
    pub paths: Paths,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub supervisor: DaemonSupervisor,
}

/// Result of daemon startup
pub struct StartupResult {
    pub daemon: Daemon,
    /// Worker completion events for the main loop
    pub event_rx: mpsc::Receiver<Event>,
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),
}

/// Start the daemon: take the lock, pick a worker backend, load tasks.
pub async fn startup(paths: &Paths) -> Result<StartupResult, LifecycleError> {
    std::fs::create_dir_all(&paths.state_dir)?;
    let lock_file = acquire_lock(&paths.lock_path)?;
    std::fs::create_dir_all(&paths.scratch_path)?;

    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let sessions = TracedSession::new(TmuxAdapter::new());
    let launcher = WorkerLauncher::detect(sessions, &paths.scratch_path, event_tx).await;

    let supervisor = Supervisor::new(
        SupervisorDeps {
            launcher,
            store: JsonTaskStore::new(&paths.state_dir),
            sink: BroadcastChangeSink::default(),
            ids: UuidIdGen,
        },
        SystemClock,
    )?;

    info!(
        state_dir = %paths.state_dir.display(),
        backend = %supervisor.backend(),
        "daemon started"
    );

    Ok(StartupResult {
        daemon: Daemon {
            paths: paths.clone(),
            lock_file,
            supervisor,
        },
        event_rx,
    })
}

/// Take the exclusive lock on `path` and write our PID into it.
pub fn acquire_lock(path: &Path) -> Result<File, LifecycleError> {
    // Open without truncating: the PID belongs to the running daemon until we
    // hold the lock.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    Ok(lock_file)
}

impl Daemon {
    /// Release workers and the lock.
    ///
    /// Tmux sessions keep running; the next daemon reattaches to them.
    pub fn shutdown(mut self) {
        self.supervisor.shutdown();

        if self.paths.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.paths.lock_path) {
                tracing::warn!(error = %e, "failed to remove PID file");
            }
        }
        info!("daemon shutdown complete");
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;

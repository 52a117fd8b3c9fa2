// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Direct child-process worker

use super::WorkerError;
use fm_core::{Event, TaskId, WorkerCommand};
use parking_lot::Mutex;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Upper bound on buffered bytes per stream; older bytes are dropped.
/// Only the tail of the output is ever kept, so this never loses what
/// the reconciler would retain.
const MAX_BUFFER_BYTES: usize = 1024 * 1024;

#[derive(Debug, Default)]
struct ProcessState {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_code: Option<i32>,
    exited: bool,
}

impl ProcessState {
    fn render(&self) -> String {
        let stdout = String::from_utf8_lossy(&self.stdout);
        if !stdout.trim().is_empty() {
            return stdout.into_owned();
        }
        let stderr = String::from_utf8_lossy(&self.stderr);
        if !stderr.trim().is_empty() {
            return stderr.into_owned();
        }
        match self.exit_code {
            Some(code) if code != 0 => {
                format!("[worker exited with code {} and produced no output]", code)
            }
            _ => "[worker produced no output]".to_string(),
        }
    }
}

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Handle for a worker running as a direct child
pub struct ProcessHandle {
    run: u64,
    pid: Option<u32>,
    state: Arc<Mutex<ProcessState>>,
    kill_tx: Option<oneshot::Sender<()>>,
}

impl ProcessHandle {
    /// Spawn `program args... <prompt>` in `work_dir`.
    ///
    /// A waiter task owns the child; it sends [`Event::WorkerExited`] once
    /// the process has exited and both pipes are drained.
    pub(crate) fn spawn(
        task_id: &TaskId,
        run: u64,
        command: &WorkerCommand,
        prompt: &str,
        work_dir: &Path,
        event_tx: mpsc::Sender<Event>,
    ) -> Result<Self, WorkerError> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .arg(prompt)
            .current_dir(work_dir)
            .env_remove("CLAUDECODE")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| WorkerError::Dispatch(format!("{}: {}", command.program, e)))?;
        let pid = child.id();
        tracing::info!(%task_id, run, pid, program = %command.program, "worker process started");

        let state = Arc::new(Mutex::new(ProcessState::default()));
        let readers = [
            child
                .stdout
                .take()
                .map(|r| tokio::spawn(drain(r, Arc::clone(&state), Stream::Stdout))),
            child
                .stderr
                .take()
                .map(|r| tokio::spawn(drain(r, Arc::clone(&state), Stream::Stderr))),
        ];

        let (kill_tx, kill_rx) = oneshot::channel();
        tokio::spawn(wait_for_exit(
            child,
            kill_rx,
            readers,
            Arc::clone(&state),
            task_id.clone(),
            run,
            event_tx,
        ));

        Ok(Self {
            run,
            pid,
            state,
            kill_tx: Some(kill_tx),
        })
    }

    pub fn run(&self) -> u64 {
        self.run
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn is_alive(&self) -> bool {
        !self.state.lock().exited
    }

    pub fn capture_output(&self) -> String {
        self.state.lock().render()
    }

    /// Kill the child. The waiter still reports the exit, stale by then.
    pub fn terminate(mut self) {
        if let Some(tx) = self.kill_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn drain<R: AsyncRead + Unpin>(mut reader: R, state: Arc<Mutex<ProcessState>>, stream: Stream) {
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let mut state = state.lock();
                let target = match stream {
                    Stream::Stdout => &mut state.stdout,
                    Stream::Stderr => &mut state.stderr,
                };
                target.extend_from_slice(&buf[..n]);
                if target.len() > MAX_BUFFER_BYTES {
                    let excess = target.len() - MAX_BUFFER_BYTES;
                    target.drain(..excess);
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "worker pipe read failed");
                break;
            }
        }
    }
}

async fn wait_for_exit(
    mut child: Child,
    mut kill_rx: oneshot::Receiver<()>,
    readers: [Option<JoinHandle<()>>; 2],
    state: Arc<Mutex<ProcessState>>,
    task_id: TaskId,
    run: u64,
    event_tx: mpsc::Sender<Event>,
) {
    // A dropped handle closes the channel without a kill request; only an
    // explicit send kills the child.
    let status = tokio::select! {
        status = child.wait() => status,
        Ok(()) = &mut kill_rx => {
            tracing::info!(%task_id, run, "killing worker process");
            if let Err(e) = child.start_kill() {
                tracing::warn!(%task_id, run, error = %e, "failed to kill worker process");
            }
            child.wait().await
        }
    };

    for reader in readers.into_iter().flatten() {
        let _ = reader.await;
    }

    let exit_code = match status {
        Ok(status) => status.code(),
        Err(e) => {
            tracing::warn!(%task_id, run, error = %e, "failed to wait for worker process");
            None
        }
    };

    let output = {
        let mut state = state.lock();
        state.exit_code = exit_code;
        state.exited = true;
        state.render()
    };
    tracing::info!(%task_id, run, exit_code, output_len = output.len(), "worker process exited");

    if event_tx
        .send(Event::WorkerExited {
            task_id,
            run,
            output,
        })
        .await
        .is_err()
    {
        tracing::debug!("event channel closed, dropping worker exit");
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;

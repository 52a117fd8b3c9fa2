// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::session::{FakeSessionAdapter, SessionCall};
use std::path::PathBuf;

const FAST_POLL: Duration = Duration::from_millis(10);

fn claude() -> WorkerCommand {
    WorkerCommand::default()
}

async fn start(
    fake: &FakeSessionAdapter,
    scratch: &Path,
    run: u64,
) -> (SessionHandle<FakeSessionAdapter>, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(8);
    let handle = SessionHandle::start(
        fake.clone(),
        &TaskId::new("1a2b3c4d"),
        run,
        &claude(),
        "fix the build",
        Path::new("/work"),
        scratch,
        FAST_POLL,
        tx,
    )
    .await
    .unwrap();
    (handle, rx)
}

#[test]
fn session_command_reads_prompt_file_as_one_argument() {
    let cmd = session_command(&claude(), Path::new("/state/scratch/fm-1a2b3c4d.prompt")).unwrap();

    assert!(cmd.starts_with("exec env -u CLAUDECODE "), "got: {cmd}");
    assert!(
        cmd.ends_with("\"$(cat /state/scratch/fm-1a2b3c4d.prompt)\""),
        "got: {cmd}"
    );
    let words = shlex::split(&cmd).unwrap();
    assert_eq!(
        words,
        vec![
            "exec",
            "env",
            "-u",
            "CLAUDECODE",
            "claude",
            "--print",
            "--dangerously-skip-permissions",
            "$(cat /state/scratch/fm-1a2b3c4d.prompt)",
        ]
    );
}

#[test]
fn session_command_quotes_unsafe_words() {
    let command = WorkerCommand {
        program: "/opt/my tools/worker".to_string(),
        args: vec!["--model=big one".to_string()],
    };
    let cmd = session_command(&command, Path::new("/tmp/prompt")).unwrap();

    let words = shlex::split(&cmd).unwrap();
    assert_eq!(words[4], "/opt/my tools/worker");
    assert_eq!(words[5], "--model=big one");
    assert_eq!(words.len(), 7);
}

#[tokio::test]
async fn start_writes_prompt_and_spawns_named_session() {
    let scratch = tempfile::tempdir().unwrap();
    let fake = FakeSessionAdapter::new();

    let (handle, _rx) = start(&fake, scratch.path(), 1).await;

    assert_eq!(handle.session(), "fm-1a2b3c4d");
    let prompt_path = scratch.path().join("fm-1a2b3c4d.prompt");
    assert_eq!(std::fs::read_to_string(&prompt_path).unwrap(), "fix the build");

    match &fake.calls()[0] {
        SessionCall::Spawn { name, cwd, cmd, log } => {
            assert_eq!(name, "fm-1a2b3c4d");
            assert_eq!(cwd, &PathBuf::from("/work"));
            assert!(cmd.contains("fm-1a2b3c4d.prompt"), "got: {cmd}");
            assert_eq!(log, &Some(scratch.path().join("fm-1a2b3c4d.log")));
        }
        other => panic!("unexpected call {other:?}"),
    }
}

#[tokio::test]
async fn start_discards_stale_log() {
    let scratch = tempfile::tempdir().unwrap();
    std::fs::write(scratch.path().join("fm-1a2b3c4d.log"), "old run").unwrap();
    let fake = FakeSessionAdapter::new();

    let (handle, _rx) = start(&fake, scratch.path(), 1).await;

    assert_eq!(handle.capture_output().await, "");
}

#[tokio::test]
async fn spawn_failure_is_session_creation_error_and_cleans_up() {
    let scratch = tempfile::tempdir().unwrap();
    let fake = FakeSessionAdapter::new();
    fake.fail_spawn("no server running");
    let (tx, _rx) = mpsc::channel(8);

    let result = SessionHandle::start(
        fake.clone(),
        &TaskId::new("1a2b3c4d"),
        1,
        &claude(),
        "p",
        Path::new("/work"),
        scratch.path(),
        FAST_POLL,
        tx,
    )
    .await;

    assert!(matches!(result, Err(WorkerError::SessionCreation(m)) if m.contains("no server running")));
    assert!(!scratch.path().join("fm-1a2b3c4d.prompt").exists());
}

#[tokio::test]
async fn capture_output_reads_log_verbatim() {
    let scratch = tempfile::tempdir().unwrap();
    let fake = FakeSessionAdapter::new();
    let (handle, _rx) = start(&fake, scratch.path(), 1).await;

    std::fs::write(scratch.path().join("fm-1a2b3c4d.log"), "\x1b[32mdone.\x1b[0m\r\n").unwrap();

    assert_eq!(handle.capture_output().await, "\x1b[32mdone.\x1b[0m\r\n");
}

#[tokio::test]
async fn poll_reports_session_end_once() {
    let scratch = tempfile::tempdir().unwrap();
    let fake = FakeSessionAdapter::new();
    let (handle, mut rx) = start(&fake, scratch.path(), 4).await;
    assert!(handle.is_alive());

    fake.set_exited("fm-1a2b3c4d");

    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        event,
        Event::SessionEnded {
            task_id: TaskId::new("1a2b3c4d"),
            run: 4
        }
    );
    assert!(!handle.is_alive());

    // The poller stops after reporting
    tokio::time::sleep(FAST_POLL * 5).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn query_failure_counts_as_gone() {
    let scratch = tempfile::tempdir().unwrap();
    let fake = FakeSessionAdapter::new();
    let (handle, mut rx) = start(&fake, scratch.path(), 1).await;

    fake.fail_queries("tmux hung");

    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, Event::SessionEnded { .. }));
    assert!(!handle.is_alive());
}

#[tokio::test]
async fn terminate_kills_session_and_removes_files() {
    let scratch = tempfile::tempdir().unwrap();
    let fake = FakeSessionAdapter::new();
    let (handle, mut rx) = start(&fake, scratch.path(), 1).await;
    std::fs::write(scratch.path().join("fm-1a2b3c4d.log"), "partial").unwrap();

    handle.terminate().await;

    assert!(fake.calls().contains(&SessionCall::Kill {
        id: "fm-1a2b3c4d".to_string()
    }));
    assert!(!scratch.path().join("fm-1a2b3c4d.prompt").exists());
    assert!(!scratch.path().join("fm-1a2b3c4d.log").exists());

    // Polling stopped, so no end event follows the kill
    tokio::time::sleep(FAST_POLL * 5).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn query_alive_asks_backend_directly() {
    let scratch = tempfile::tempdir().unwrap();
    let fake = FakeSessionAdapter::new();
    let (handle, _rx) = start(&fake, scratch.path(), 1).await;
    assert!(handle.query_alive().await);

    fake.set_exited("fm-1a2b3c4d");

    // The cached poll result may still be stale; the direct query is not
    assert!(!handle.query_alive().await);
}

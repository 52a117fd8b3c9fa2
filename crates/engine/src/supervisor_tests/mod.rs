// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor tests

mod config;
mod dispatch;
mod events;
mod lifecycle;
mod recovery;

use super::*;
use fm_adapters::{FakeChangeSink, FakeSessionAdapter, SessionCall};
use fm_core::{Event, FakeClock, SequentialIdGen, WorkerCommand};
use fm_storage::MemoryTaskStore;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use tokio::sync::mpsc;

type TestSupervisor =
    Supervisor<FakeSessionAdapter, MemoryTaskStore, FakeChangeSink, FakeClock, SequentialIdGen>;

struct TestContext {
    supervisor: TestSupervisor,
    store: MemoryTaskStore,
    sink: FakeChangeSink,
    sessions: FakeSessionAdapter,
    clock: FakeClock,
    event_rx: mpsc::Receiver<Event>,
    scratch: TempDir,
    work_dir: TempDir,
}

fn sh(script: &str) -> WorkerCommand {
    // `sh -c script prompt`: the prompt lands in $0
    WorkerCommand {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
    }
}

fn setup(backend: Backend) -> TestContext {
    setup_with(backend, Vec::new(), WorkerCommand::default())
}

fn setup_with(backend: Backend, tasks: Vec<Task>, worker: WorkerCommand) -> TestContext {
    let scratch = tempdir().unwrap();
    let work_dir = tempdir().unwrap();
    let sessions = FakeSessionAdapter::new();
    let (event_tx, event_rx) = mpsc::channel(32);
    let launcher = WorkerLauncher::new(backend, sessions.clone(), scratch.path(), event_tx)
        .with_poll_interval(Duration::from_millis(10));

    let config = Config {
        poll_interval_secs: 10,
        work_dir: work_dir.path().to_path_buf(),
        worker,
    };
    let store = MemoryTaskStore::with_tasks(tasks).with_config(config);
    let sink = FakeChangeSink::new();
    let clock = FakeClock::new();

    let supervisor = Supervisor::new(
        SupervisorDeps {
            launcher,
            store: store.clone(),
            sink: sink.clone(),
            ids: SequentialIdGen::default(),
        },
        clock.clone(),
    )
    .unwrap();

    TestContext {
        supervisor,
        store,
        sink,
        sessions,
        clock,
        event_rx,
        scratch,
        work_dir,
    }
}

impl TestContext {
    fn task(&self, id: &str) -> Task {
        self.store
            .tasks()
            .into_iter()
            .find(|t| t.id == id)
            .unwrap_or_else(|| panic!("task {id} not in store"))
    }

    fn log_path(&self, id: &str) -> PathBuf {
        self.scratch.path().join(format!("fm-{id}.log"))
    }

    fn prompt_path(&self, id: &str) -> PathBuf {
        self.scratch.path().join(format!("fm-{id}.prompt"))
    }

    fn spawn_count(&self) -> usize {
        self.sessions
            .calls()
            .iter()
            .filter(|c| matches!(c, SessionCall::Spawn { .. }))
            .count()
    }

    async fn next_event(&mut self) -> Event {
        tokio::time::timeout(Duration::from_secs(10), self.event_rx.recv())
            .await
            .expect("timed out waiting for worker event")
            .expect("event channel closed")
    }

    /// Deliver the next worker event to the supervisor.
    async fn settle(&mut self) {
        let event = self.next_event().await;
        self.supervisor.handle_event(event).await.unwrap();
    }
}

fn running_task(id: &str) -> Task {
    Task::builder().id(id).status(TaskStatus::Running).build()
}

fn assert_exists(path: &Path, exists: bool) {
    assert_eq!(path.exists(), exists, "{}", path.display());
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::SupervisorError;
use fm_core::{ConfigError, ConfigUpdate, MAX_POLL_INTERVAL_SECS};

#[tokio::test]
async fn invalid_update_is_rejected_and_nothing_changes() {
    let mut ctx = setup(Backend::Session);
    let before = ctx.supervisor.config().clone();

    let err = ctx
        .supervisor
        .update_config(ConfigUpdate {
            poll_interval_secs: Some(0),
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SupervisorError::InvalidConfig(ConfigError::ZeroInterval)
    ));
    assert_eq!(ctx.supervisor.config(), &before);
    assert_eq!(ctx.store.config(), before);
}

#[tokio::test]
async fn oversized_interval_is_rejected_and_scheduler_still_starts() {
    let mut ctx = setup(Backend::Session);
    ctx.supervisor.create_task("fix bug", "").await.unwrap();

    let err = ctx
        .supervisor
        .update_config(ConfigUpdate {
            poll_interval_secs: Some(u64::MAX),
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SupervisorError::InvalidConfig(ConfigError::IntervalTooLong {
            max: MAX_POLL_INTERVAL_SECS
        })
    ));
    assert_eq!(ctx.supervisor.config().poll_interval_secs, 10);

    assert!(ctx.supervisor.start_scheduler().await);
    assert_eq!(ctx.task("task-1").status, TaskStatus::Running);
}

#[tokio::test]
async fn valid_update_is_persisted() {
    let mut ctx = setup(Backend::Session);
    let dir = tempdir().unwrap();

    let config = ctx
        .supervisor
        .update_config(ConfigUpdate {
            work_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(config.work_dir, dir.path());
    assert_eq!(config.poll_interval_secs, 10);
    assert_eq!(ctx.store.config(), config);
}

#[tokio::test]
async fn new_work_dir_applies_to_next_dispatch() {
    let mut ctx = setup(Backend::Session);
    let dir = tempdir().unwrap();
    ctx.supervisor
        .update_config(ConfigUpdate {
            work_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        })
        .await
        .unwrap();
    ctx.supervisor.create_task("fix bug", "").await.unwrap();

    ctx.supervisor.tick().await.unwrap();

    assert_eq!(ctx.sessions.get_session("fm-task-1").unwrap().cwd, dir.path());
}

#[tokio::test]
async fn interval_change_restarts_running_scheduler() {
    let mut ctx = setup(Backend::Session);
    ctx.supervisor.start_scheduler().await;
    ctx.supervisor.create_task("fix bug", "").await.unwrap();

    ctx.supervisor
        .update_config(ConfigUpdate {
            poll_interval_secs: Some(30),
            ..Default::default()
        })
        .await
        .unwrap();

    // Restart ticks immediately
    assert_eq!(ctx.task("task-1").status, TaskStatus::Running);
    let status = ctx.supervisor.scheduler_status();
    assert!(status.running);
    assert_eq!(status.poll_interval_secs, 30);

    ctx.supervisor.create_task("second", "").await.unwrap();
    ctx.clock.advance(Duration::from_secs(10));
    ctx.supervisor.check_timers().await;
    assert_eq!(ctx.task("task-2").status, TaskStatus::Pending);

    ctx.clock.advance(Duration::from_secs(20));
    ctx.supervisor.check_timers().await;
    assert_eq!(ctx.task("task-2").status, TaskStatus::Running);
}

#[tokio::test]
async fn interval_change_does_not_start_stopped_scheduler() {
    let mut ctx = setup(Backend::Session);
    ctx.supervisor.create_task("fix bug", "").await.unwrap();

    ctx.supervisor
        .update_config(ConfigUpdate {
            poll_interval_secs: Some(5),
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(!ctx.supervisor.scheduler_status().running);
    assert_eq!(ctx.task("task-1").status, TaskStatus::Pending);
}

#[yare::parameterized(
    zero = { 0 },
    oversized = { u64::MAX },
)]
fn invalid_persisted_config_falls_back_to_default(poll_interval_secs: u64) {
    let (event_tx, _event_rx) = mpsc::channel(1);
    let scratch = tempdir().unwrap();
    let launcher = WorkerLauncher::new(
        Backend::Process,
        FakeSessionAdapter::new(),
        scratch.path(),
        event_tx,
    );
    let store = MemoryTaskStore::new().with_config(Config {
        poll_interval_secs,
        ..Config::default()
    });

    let supervisor: TestSupervisor = Supervisor::new(
        SupervisorDeps {
            launcher,
            store,
            sink: FakeChangeSink::new(),
            ids: SequentialIdGen::default(),
        },
        FakeClock::new(),
    )
    .unwrap();

    assert_eq!(supervisor.config(), &Config::default());
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn id(s: &str) -> TaskId {
    TaskId::new(s)
}

/// Dispatch one session-backed task, then end its session with `log`.
async fn ended_session(log: &str) -> TestContext {
    let mut ctx = setup(Backend::Session);
    ctx.supervisor.create_task("fix bug", "").await.unwrap();
    ctx.supervisor.tick().await.unwrap();
    std::fs::write(ctx.log_path("task-1"), log).unwrap();
    ctx.sessions.set_exited("fm-task-1");
    ctx
}

#[tokio::test]
async fn session_end_reconciles_from_log() {
    let mut ctx = ended_session("\x1b[?25lworking\r\n\x1b[32mall green\x1b[0m\r\n").await;
    let notified = ctx.sink.count();

    ctx.settle().await;

    let task = ctx.task("task-1");
    assert_eq!(task.status, TaskStatus::Review);
    assert_eq!(task.output.as_deref(), Some("working\nall green"));
    assert_eq!(ctx.sink.count(), notified + 1);
    assert_eq!(ctx.supervisor.live_workers(), 0);
    assert_exists(&ctx.log_path("task-1"), false);
    assert_exists(&ctx.prompt_path("task-1"), false);
}

#[tokio::test]
async fn session_end_without_output_uses_placeholder() {
    let mut ctx = ended_session("\x1b[2J\r\n").await;

    ctx.settle().await;

    let task = ctx.task("task-1");
    assert_eq!(task.status, TaskStatus::Review);
    assert_eq!(task.output.as_deref(), Some(crate::NO_OUTPUT_PLACEHOLDER));
}

#[tokio::test]
async fn stale_run_is_ignored() {
    let mut ctx = setup(Backend::Session);
    ctx.supervisor.create_task("fix bug", "").await.unwrap();
    ctx.supervisor.tick().await.unwrap();
    let saves = ctx.store.saves();

    ctx.supervisor
        .handle_event(Event::WorkerExited {
            task_id: id("task-1"),
            run: 99,
            output: "from an older run".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(ctx.task("task-1").status, TaskStatus::Running);
    assert_eq!(ctx.supervisor.live_workers(), 1);
    assert_eq!(ctx.store.saves(), saves);
}

#[tokio::test]
async fn tick_reconciles_dead_worker_before_its_event() {
    let mut ctx = ended_session("finished\n").await;
    // The poller flags the handle dead before it sends
    let event = ctx.next_event().await;

    assert_eq!(ctx.supervisor.tick().await.unwrap(), 1);
    assert_eq!(ctx.task("task-1").output.as_deref(), Some("finished"));
    let saves = ctx.store.saves();

    ctx.supervisor.handle_event(event).await.unwrap();

    assert_eq!(ctx.task("task-1").status, TaskStatus::Review);
    assert_eq!(ctx.store.saves(), saves);
}

#[tokio::test]
async fn event_for_deleted_task_is_ignored() {
    let mut ctx = setup_with(Backend::Process, Vec::new(), sh("sleep 0.2; echo late"));
    ctx.supervisor.create_task("fix bug", "").await.unwrap();
    ctx.supervisor.tick().await.unwrap();

    ctx.supervisor.delete_task(&id("task-1")).await.unwrap();
    let saves = ctx.store.saves();

    ctx.supervisor
        .handle_event(Event::WorkerExited {
            task_id: id("task-1"),
            run: 1,
            output: "late".to_string(),
        })
        .await
        .unwrap();

    assert!(ctx.store.tasks().is_empty());
    assert_eq!(ctx.store.saves(), saves);
}

#[tokio::test]
async fn process_exit_event_carries_stderr_when_stdout_is_empty() {
    let mut ctx = setup_with(
        Backend::Process,
        Vec::new(),
        sh("echo 'error: not logged in' >&2; exit 1"),
    );
    ctx.supervisor.create_task("fix bug", "").await.unwrap();
    ctx.supervisor.tick().await.unwrap();

    match ctx.next_event().await {
        event @ Event::WorkerExited { .. } => {
            ctx.supervisor.handle_event(event).await.unwrap();
        }
        other => panic!("unexpected event {other:?}"),
    }

    let task = ctx.task("task-1");
    assert_eq!(task.status, TaskStatus::Review);
    assert_eq!(task.output.as_deref(), Some("error: not logged in"));
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn tick_dispatches_pending_task_into_session() {
    let mut ctx = setup(Backend::Session);
    let task = ctx
        .supervisor
        .create_task("fix bug", "the build is red")
        .await
        .unwrap();

    assert_eq!(ctx.supervisor.tick().await.unwrap(), 1);

    let stored = ctx.task("task-1");
    assert_eq!(stored.status, TaskStatus::Running);
    assert_eq!(ctx.supervisor.live_workers(), 1);
    match &ctx.sessions.calls()[0] {
        SessionCall::Spawn { name, cwd, log, .. } => {
            assert_eq!(name, "fm-task-1");
            assert_eq!(cwd, ctx.work_dir.path());
            assert_eq!(log.as_deref(), Some(ctx.log_path("task-1").as_path()));
        }
        other => panic!("unexpected call {other:?}"),
    }
    let prompt = std::fs::read_to_string(ctx.prompt_path("task-1")).unwrap();
    assert!(prompt.contains(&task.title));
    assert!(prompt.contains("the build is red"));
}

#[tokio::test]
async fn tick_dispatches_every_pending_task_and_notifies_once() {
    let mut ctx = setup(Backend::Session);
    ctx.supervisor.create_task("one", "").await.unwrap();
    ctx.supervisor.create_task("two", "").await.unwrap();
    let notified_before = ctx.sink.count();

    ctx.supervisor.tick().await.unwrap();

    assert_eq!(ctx.task("task-1").status, TaskStatus::Running);
    assert_eq!(ctx.task("task-2").status, TaskStatus::Running);
    assert_eq!(ctx.sink.count(), notified_before + 1);
}

#[tokio::test]
async fn idle_tick_does_not_save_or_notify() {
    let mut ctx = setup_with(
        Backend::Session,
        vec![Task::builder().id("a").status(TaskStatus::Review).build()],
        WorkerCommand::default(),
    );

    assert_eq!(ctx.supervisor.tick().await.unwrap(), 0);

    assert_eq!(ctx.store.saves(), 0);
    assert_eq!(ctx.sink.count(), 0);
}

#[tokio::test]
async fn running_task_with_live_worker_is_left_alone() {
    let mut ctx = setup(Backend::Session);
    ctx.supervisor.create_task("fix bug", "").await.unwrap();
    ctx.supervisor.tick().await.unwrap();
    let saves = ctx.store.saves();

    assert_eq!(ctx.supervisor.tick().await.unwrap(), 0);

    assert_eq!(ctx.spawn_count(), 1);
    assert_eq!(ctx.store.saves(), saves);
    assert_eq!(ctx.task("task-1").status, TaskStatus::Running);
}

#[tokio::test]
async fn session_creation_failure_finishes_task_with_error() {
    let mut ctx = setup(Backend::Session);
    ctx.sessions.fail_spawn("no server running on /tmp/tmux-0/default");
    ctx.supervisor.create_task("fix bug", "").await.unwrap();

    ctx.supervisor.tick().await.unwrap();

    let task = ctx.task("task-1");
    assert_eq!(task.status, TaskStatus::Review);
    let output = task.output.unwrap();
    assert!(output.contains("failed to create session"), "got: {output}");
    assert!(output.contains("no server running"), "got: {output}");
    assert_eq!(ctx.supervisor.live_workers(), 0);
    assert_exists(&ctx.prompt_path("task-1"), false);
}

#[tokio::test]
async fn missing_worker_binary_finishes_task_with_error() {
    let worker = WorkerCommand {
        program: "/nonexistent/worker".to_string(),
        args: vec![],
    };
    let mut ctx = setup_with(Backend::Process, Vec::new(), worker);
    ctx.supervisor.create_task("fix bug", "").await.unwrap();

    ctx.supervisor.tick().await.unwrap();

    let task = ctx.task("task-1");
    assert_eq!(task.status, TaskStatus::Review);
    assert!(task.output.unwrap().contains("failed to spawn worker"));
}

#[tokio::test]
async fn start_scheduler_ticks_immediately_once() {
    let mut ctx = setup(Backend::Session);
    ctx.supervisor.create_task("fix bug", "").await.unwrap();

    assert!(ctx.supervisor.start_scheduler().await);
    assert_eq!(ctx.task("task-1").status, TaskStatus::Running);

    assert!(!ctx.supervisor.start_scheduler().await);
    assert_eq!(ctx.spawn_count(), 1);
    assert!(ctx.supervisor.scheduler_status().running);
}

#[tokio::test]
async fn check_timers_ticks_only_when_due() {
    let mut ctx = setup(Backend::Session);
    ctx.supervisor.start_scheduler().await;
    ctx.supervisor.create_task("fix bug", "").await.unwrap();

    ctx.clock.advance(Duration::from_secs(5));
    ctx.supervisor.check_timers().await;
    assert_eq!(ctx.task("task-1").status, TaskStatus::Pending);

    ctx.clock.advance(Duration::from_secs(5));
    ctx.supervisor.check_timers().await;
    assert_eq!(ctx.task("task-1").status, TaskStatus::Running);
}

#[tokio::test]
async fn stopped_scheduler_does_not_tick() {
    let mut ctx = setup(Backend::Session);
    ctx.supervisor.start_scheduler().await;
    ctx.supervisor.stop_scheduler();
    ctx.supervisor.stop_scheduler();
    ctx.supervisor.create_task("fix bug", "").await.unwrap();

    ctx.clock.advance(Duration::from_secs(60));
    ctx.supervisor.check_timers().await;

    assert_eq!(ctx.task("task-1").status, TaskStatus::Pending);
    assert!(!ctx.supervisor.scheduler_status().running);
}

#[tokio::test]
async fn scheduler_status_reports_backend_and_interval() {
    let ctx = setup(Backend::Process);
    assert_eq!(
        ctx.supervisor.scheduler_status(),
        SchedulerStatus {
            running: false,
            poll_interval_secs: 10,
            backend: Backend::Process,
        }
    );
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{NO_OUTPUT_PLACEHOLDER, UNSUPERVISED_PLACEHOLDER};

#[tokio::test]
async fn running_task_reattaches_to_live_session() {
    let mut ctx = setup_with(Backend::Session, vec![running_task("a")], WorkerCommand::default());
    ctx.sessions.add_session("fm-a", true);

    assert_eq!(ctx.supervisor.tick().await.unwrap(), 0);

    assert_eq!(ctx.supervisor.live_workers(), 1);
    assert_eq!(ctx.task("a").status, TaskStatus::Running);
    assert_eq!(ctx.spawn_count(), 0);

    // The reattached handle reports like a dispatched one
    std::fs::write(ctx.log_path("a"), "picked up where it left off\n").unwrap();
    ctx.sessions.set_exited("fm-a");
    ctx.settle().await;

    let task = ctx.task("a");
    assert_eq!(task.status, TaskStatus::Review);
    assert_eq!(task.output.as_deref(), Some("picked up where it left off"));
}

#[tokio::test]
async fn session_that_ended_unsupervised_is_reconciled_from_log() {
    let mut ctx = setup_with(Backend::Session, vec![running_task("a")], WorkerCommand::default());
    std::fs::write(ctx.log_path("a"), "checked\n[QUESTION]: keep the old API?\n").unwrap();
    std::fs::write(ctx.prompt_path("a"), "# Task: fix bug\n").unwrap();

    assert_eq!(ctx.supervisor.tick().await.unwrap(), 1);

    let task = ctx.task("a");
    assert_eq!(task.status, TaskStatus::Question);
    assert_eq!(task.question.as_deref(), Some("keep the old API?"));
    assert_eq!(ctx.supervisor.live_workers(), 0);
    assert_exists(&ctx.log_path("a"), false);
    assert_exists(&ctx.prompt_path("a"), false);
}

#[tokio::test]
async fn session_that_ended_without_log_gets_placeholder() {
    let mut ctx = setup_with(Backend::Session, vec![running_task("a")], WorkerCommand::default());

    ctx.supervisor.tick().await.unwrap();

    let task = ctx.task("a");
    assert_eq!(task.status, TaskStatus::Review);
    assert_eq!(task.output.as_deref(), Some(UNSUPERVISED_PLACEHOLDER));
}

#[tokio::test]
async fn session_that_ended_with_empty_log_gets_placeholder() {
    let mut ctx = setup_with(Backend::Session, vec![running_task("a")], WorkerCommand::default());
    std::fs::write(ctx.log_path("a"), "\x1b[0m\n  \n").unwrap();

    ctx.supervisor.tick().await.unwrap();

    let task = ctx.task("a");
    assert_eq!(task.status, TaskStatus::Review);
    assert_eq!(task.output.as_deref(), Some(UNSUPERVISED_PLACEHOLDER));
}

#[tokio::test]
async fn failing_liveness_query_counts_as_ended() {
    let mut ctx = setup_with(Backend::Session, vec![running_task("a")], WorkerCommand::default());
    ctx.sessions.add_session("fm-a", true);
    ctx.sessions.fail_queries("server exited unexpectedly");

    ctx.supervisor.tick().await.unwrap();

    assert_eq!(ctx.task("a").status, TaskStatus::Review);
    assert_eq!(ctx.supervisor.live_workers(), 0);
}

#[tokio::test]
async fn process_backend_requeues_orphaned_task() {
    let mut ctx = setup_with(
        Backend::Process,
        vec![running_task("a")],
        sh("echo second attempt"),
    );

    assert_eq!(ctx.supervisor.tick().await.unwrap(), 1);
    let task = ctx.task("a");
    assert_eq!(task.status, TaskStatus::Pending);
    assert!(task.history.is_empty());

    ctx.supervisor.tick().await.unwrap();
    assert_eq!(ctx.task("a").status, TaskStatus::Running);
    ctx.settle().await;
    assert_eq!(ctx.task("a").output.as_deref(), Some("second attempt"));
}

#[tokio::test]
async fn shutdown_leaves_sessions_running() {
    let mut ctx = setup(Backend::Session);
    ctx.supervisor.create_task("fix bug", "").await.unwrap();
    ctx.supervisor.start_scheduler().await;

    ctx.supervisor.shutdown();

    assert_eq!(ctx.supervisor.live_workers(), 0);
    assert!(!ctx.supervisor.scheduler_status().running);
    assert!(!ctx
        .sessions
        .calls()
        .iter()
        .any(|c| matches!(c, SessionCall::Kill { .. })));
    assert!(ctx.sessions.get_session("fm-task-1").unwrap().alive);
    assert_exists(&ctx.prompt_path("task-1"), true);
}

#[tokio::test]
async fn shutdown_kills_direct_children() {
    let mut ctx = setup_with(Backend::Process, Vec::new(), sh("sleep 30"));
    ctx.supervisor.create_task("fix bug", "").await.unwrap();
    ctx.supervisor.tick().await.unwrap();

    ctx.supervisor.shutdown();

    // The killed child still reports its exit; nothing is registered for it
    let event = ctx.next_event().await;
    ctx.supervisor.handle_event(event).await.unwrap();
    assert_eq!(ctx.task("task-1").status, TaskStatus::Running);
    assert_eq!(ctx.supervisor.live_workers(), 0);
}

// Orphans: running tasks from an earlier supervisor that no tick has
// picked up yet, so nothing is registered for them.

#[tokio::test]
async fn delete_kills_orphaned_session_and_its_files() {
    let mut ctx = setup_with(Backend::Session, vec![running_task("a")], WorkerCommand::default());
    ctx.sessions.add_session("fm-a", true);
    std::fs::write(ctx.log_path("a"), "halfway\n").unwrap();
    std::fs::write(ctx.prompt_path("a"), "# Task: fix bug\n").unwrap();

    ctx.supervisor.delete_task(&TaskId::new("a")).await.unwrap();

    assert!(ctx.sessions.calls().contains(&SessionCall::Kill {
        id: "fm-a".to_string()
    }));
    assert!(!ctx.sessions.get_session("fm-a").unwrap().alive);
    assert_exists(&ctx.log_path("a"), false);
    assert_exists(&ctx.prompt_path("a"), false);
    assert!(ctx.store.tasks().is_empty());
    assert_eq!(ctx.supervisor.live_workers(), 0);
}

#[tokio::test]
async fn delete_of_orphan_whose_session_ended_removes_files() {
    let mut ctx = setup_with(Backend::Session, vec![running_task("a")], WorkerCommand::default());
    std::fs::write(ctx.log_path("a"), "done.\n").unwrap();

    ctx.supervisor.delete_task(&TaskId::new("a")).await.unwrap();

    assert_exists(&ctx.log_path("a"), false);
    assert!(ctx.store.tasks().is_empty());
}

#[tokio::test]
async fn stop_captures_and_kills_orphaned_session() {
    let mut ctx = setup_with(Backend::Session, vec![running_task("a")], WorkerCommand::default());
    ctx.sessions.add_session("fm-a", true);
    std::fs::write(ctx.log_path("a"), "partial work\n").unwrap();

    let task = ctx.supervisor.stop_task(&TaskId::new("a")).await.unwrap();

    assert_eq!(task.status, TaskStatus::Review);
    assert_eq!(task.output.as_deref(), Some("partial work"));
    assert!(!ctx.sessions.get_session("fm-a").unwrap().alive);
    assert_exists(&ctx.log_path("a"), false);
    assert_eq!(ctx.supervisor.live_workers(), 0);
    assert_eq!(ctx.task("a"), task);
}

#[tokio::test]
async fn stop_reconciles_orphan_from_surviving_log() {
    let mut ctx = setup_with(Backend::Session, vec![running_task("a")], WorkerCommand::default());
    std::fs::write(ctx.log_path("a"), "[QUESTION]: which branch?\n").unwrap();

    let task = ctx.supervisor.stop_task(&TaskId::new("a")).await.unwrap();

    assert_eq!(task.status, TaskStatus::Question);
    assert_eq!(task.question.as_deref(), Some("which branch?"));
}

#[tokio::test]
async fn stop_of_orphan_without_log_gets_unsupervised_placeholder() {
    let mut ctx = setup_with(Backend::Session, vec![running_task("a")], WorkerCommand::default());

    let task = ctx.supervisor.stop_task(&TaskId::new("a")).await.unwrap();

    assert_eq!(task.status, TaskStatus::Review);
    assert_eq!(task.output.as_deref(), Some(UNSUPERVISED_PLACEHOLDER));
}

#[tokio::test]
async fn stop_of_process_orphan_has_no_output() {
    let mut ctx = setup_with(Backend::Process, vec![running_task("a")], sh("true"));

    let task = ctx.supervisor.stop_task(&TaskId::new("a")).await.unwrap();

    assert_eq!(task.status, TaskStatus::Review);
    assert_eq!(task.output.as_deref(), Some(NO_OUTPUT_PLACEHOLDER));
}

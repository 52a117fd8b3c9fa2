// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::SupervisorError;
use fm_core::{Role, TransitionError};

fn id(s: &str) -> TaskId {
    TaskId::new(s)
}

#[tokio::test]
async fn finished_worker_moves_task_to_review() {
    let mut ctx = setup_with(Backend::Process, Vec::new(), sh("printf 'done.\\n'"));
    ctx.supervisor.create_task("fix bug", "").await.unwrap();

    ctx.supervisor.tick().await.unwrap();
    ctx.settle().await;

    let task = ctx.task("task-1");
    assert_eq!(task.status, TaskStatus::Review);
    assert_eq!(task.output.as_deref(), Some("done."));
    assert_eq!(task.question, None);
    assert_eq!(task.last_entry().map(|e| e.role), Some(Role::Worker));
    assert_eq!(ctx.supervisor.live_workers(), 0);
}

#[tokio::test]
async fn worker_question_moves_task_to_question() {
    let script = "printf 'looked around\\n[QUESTION]: which env?\\n'";
    let mut ctx = setup_with(Backend::Process, Vec::new(), sh(script));
    ctx.supervisor.create_task("deploy", "").await.unwrap();

    ctx.supervisor.tick().await.unwrap();
    ctx.settle().await;

    let task = ctx.task("task-1");
    assert_eq!(task.status, TaskStatus::Question);
    assert_eq!(task.question.as_deref(), Some("which env?"));
}

#[tokio::test]
async fn worker_runs_in_configured_directory() {
    let mut ctx = setup_with(Backend::Process, Vec::new(), sh("pwd"));
    ctx.supervisor.create_task("where", "").await.unwrap();

    ctx.supervisor.tick().await.unwrap();
    ctx.settle().await;

    let expected = ctx.work_dir.path().canonicalize().unwrap();
    let output = ctx.task("task-1").output.unwrap();
    assert_eq!(Path::new(&output).canonicalize().unwrap(), expected);
}

#[tokio::test]
async fn reject_without_feedback_is_refused() {
    let mut ctx = setup_with(
        Backend::Session,
        vec![Task::builder().id("a").status(TaskStatus::Review).build()],
        WorkerCommand::default(),
    );

    let err = ctx
        .supervisor
        .request_transition(&id("a"), TaskStatus::Pending, Some("   "))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SupervisorError::Transition(TransitionError::MissingFeedback { .. })
    ));
    assert_eq!(ctx.task("a").status, TaskStatus::Review);
    assert_eq!(ctx.store.saves(), 0);
}

#[tokio::test]
async fn rejected_task_is_redispatched_with_feedback() {
    let mut ctx = setup_with(
        Backend::Session,
        vec![Task::builder()
            .id("a")
            .status(TaskStatus::Review)
            .output("patched the wrong file")
            .entry(Role::Worker, "patched the wrong file")
            .build()],
        WorkerCommand::default(),
    );

    let task = ctx
        .supervisor
        .request_transition(&id("a"), TaskStatus::Pending, Some("use src/lib.rs"))
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.feedback.as_deref(), Some("use src/lib.rs"));

    ctx.supervisor.tick().await.unwrap();

    assert_eq!(ctx.task("a").status, TaskStatus::Running);
    let prompt = std::fs::read_to_string(ctx.prompt_path("a")).unwrap();
    assert!(prompt.contains("patched the wrong file"));
    assert!(prompt.contains("use src/lib.rs"));
}

#[tokio::test]
async fn approve_completes_task_for_good() {
    let mut ctx = setup_with(
        Backend::Session,
        vec![Task::builder().id("a").status(TaskStatus::Review).build()],
        WorkerCommand::default(),
    );

    let task = ctx
        .supervisor
        .request_transition(&id("a"), TaskStatus::Completed, None)
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(ctx.sink.count(), 1);

    let err = ctx
        .supervisor
        .request_transition(&id("a"), TaskStatus::Pending, Some("again"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SupervisorError::Transition(TransitionError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn user_cannot_request_scheduler_or_worker_edges() {
    let mut ctx = setup_with(
        Backend::Session,
        vec![
            Task::builder().id("p").build(),
            running_task("r"),
        ],
        WorkerCommand::default(),
    );

    for (task, to) in [("p", TaskStatus::Running), ("r", TaskStatus::Review)] {
        let err = ctx
            .supervisor
            .request_transition(&id(task), to, None)
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                SupervisorError::Transition(TransitionError::InvalidTransition { .. })
            ),
            "{task} -> {to}: {err}"
        );
    }
    assert_eq!(ctx.store.saves(), 0);
}

#[tokio::test]
async fn answering_question_requeues_and_clears_question() {
    let mut ctx = setup_with(
        Backend::Session,
        vec![Task::builder()
            .id("a")
            .status(TaskStatus::Question)
            .question("which env?")
            .build()],
        WorkerCommand::default(),
    );

    let task = ctx
        .supervisor
        .request_transition(&id("a"), TaskStatus::Pending, Some("staging"))
        .await
        .unwrap();

    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.question, None);
    assert_eq!(task.feedback.as_deref(), Some("staging"));
    assert_eq!(ctx.task("a"), task);
}

#[tokio::test]
async fn create_task_trims_and_rejects_blank_title() {
    let mut ctx = setup(Backend::Session);

    let err = ctx.supervisor.create_task("  \n ", "desc").await.unwrap_err();
    assert!(matches!(err, SupervisorError::EmptyTitle));
    assert!(ctx.store.tasks().is_empty());

    let task = ctx
        .supervisor
        .create_task("  fix bug ", " the build is red\n")
        .await
        .unwrap();
    assert_eq!(task.id, "task-1");
    assert_eq!(task.title, "fix bug");
    assert_eq!(task.description, "the build is red");
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(ctx.supervisor.list_tasks().unwrap(), vec![task]);
}

#[tokio::test]
async fn unknown_task_is_not_found() {
    let mut ctx = setup(Backend::Session);
    let missing = id("nope");

    assert!(matches!(
        ctx.supervisor.get_task(&missing),
        Err(SupervisorError::TaskNotFound(_))
    ));
    assert!(matches!(
        ctx.supervisor.delete_task(&missing).await,
        Err(SupervisorError::TaskNotFound(_))
    ));
    assert!(matches!(
        ctx.supervisor
            .request_transition(&missing, TaskStatus::Completed, None)
            .await,
        Err(SupervisorError::TaskNotFound(_))
    ));
    assert!(matches!(
        ctx.supervisor.stop_task(&missing).await,
        Err(SupervisorError::TaskNotFound(_))
    ));
}

#[tokio::test]
async fn deleting_running_task_kills_its_session() {
    let mut ctx = setup(Backend::Session);
    ctx.supervisor.create_task("fix bug", "").await.unwrap();
    ctx.supervisor.tick().await.unwrap();

    ctx.supervisor.delete_task(&id("task-1")).await.unwrap();

    assert!(ctx.store.tasks().is_empty());
    assert_eq!(ctx.supervisor.live_workers(), 0);
    assert!(ctx.sessions.calls().contains(&SessionCall::Kill {
        id: "fm-task-1".to_string()
    }));
    assert_exists(&ctx.prompt_path("task-1"), false);
}

#[tokio::test]
async fn stop_task_reconciles_partial_log() {
    let mut ctx = setup(Backend::Session);
    ctx.supervisor.create_task("fix bug", "").await.unwrap();
    ctx.supervisor.tick().await.unwrap();
    std::fs::write(ctx.log_path("task-1"), "\x1b[32mhalf way\x1b[0m\r\n").unwrap();

    let task = ctx.supervisor.stop_task(&id("task-1")).await.unwrap();

    assert_eq!(task.status, TaskStatus::Review);
    assert_eq!(task.output.as_deref(), Some("half way"));
    assert_eq!(ctx.supervisor.live_workers(), 0);
    assert!(ctx.sessions.calls().contains(&SessionCall::Kill {
        id: "fm-task-1".to_string()
    }));
    assert_exists(&ctx.log_path("task-1"), false);
}

#[tokio::test]
async fn stop_task_refuses_task_that_is_not_running() {
    let mut ctx = setup_with(
        Backend::Session,
        vec![Task::builder().id("a").status(TaskStatus::Review).build()],
        WorkerCommand::default(),
    );

    let err = ctx.supervisor.stop_task(&id("a")).await.unwrap_err();

    assert!(matches!(
        err,
        SupervisorError::Transition(TransitionError::InvalidTransition {
            from: TaskStatus::Review,
            to: TaskStatus::Review,
        })
    ));
}

#[tokio::test]
async fn peek_output_shows_live_log_then_stored_output() {
    let mut ctx = setup_with(
        Backend::Session,
        vec![
            Task::builder().id("p").build(),
            Task::builder()
                .id("r")
                .status(TaskStatus::Review)
                .output("all green")
                .build(),
        ],
        WorkerCommand::default(),
    );
    assert_eq!(ctx.supervisor.peek_output(&id("p")).await.unwrap(), "");
    assert_eq!(ctx.supervisor.peek_output(&id("r")).await.unwrap(), "all green");

    ctx.supervisor.tick().await.unwrap();
    assert_eq!(ctx.supervisor.peek_output(&id("p")).await.unwrap(), "");

    std::fs::write(ctx.log_path("p"), "\x1b[1mcompiling\x1b[0m\r\n").unwrap();
    assert_eq!(
        ctx.supervisor.peek_output(&id("p")).await.unwrap(),
        "compiling"
    );
    assert_eq!(ctx.task("p").status, TaskStatus::Running);
}

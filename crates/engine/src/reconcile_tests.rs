// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fm_core::{Role, WorkerRef};
use proptest::prelude::*;
use yare::parameterized;

fn running() -> Task {
    let mut task = Task::builder().status(TaskStatus::Running).build();
    task.worker = Some(WorkerRef::Process { run: 1, pid: Some(42) });
    task
}

#[test]
fn plain_output_goes_to_review() {
    let mut task = running();

    assert!(reconcile(&mut task, Some("done.\n"), 2_000_000));

    assert_eq!(task.status, TaskStatus::Review);
    assert_eq!(task.output.as_deref(), Some("done."));
    assert_eq!(task.question, None);
    assert_eq!(task.worker, None);
    assert_eq!(task.updated_at_ms, 2_000_000);
    let last = task.last_entry().unwrap();
    assert_eq!(last.role, Role::Worker);
    assert_eq!(last.content, "done.");
}

#[test]
fn question_line_goes_to_question() {
    let mut task = running();

    reconcile(
        &mut task,
        Some("some analysis\n[QUESTION]: which env?\nmore text"),
        2_000_000,
    );

    assert_eq!(task.status, TaskStatus::Question);
    assert_eq!(task.question.as_deref(), Some("which env?"));
    assert_eq!(
        task.output.as_deref(),
        Some("some analysis\n[QUESTION]: which env?\nmore text")
    );
}

#[parameterized(
    absent = { None },
    empty = { Some("") },
    whitespace = { Some(" \n\t ") },
    control_only = { Some("\x1b[2J\x1b[H\r") },
)]
fn missing_output_uses_placeholder(raw: Option<&str>) {
    let mut task = running();
    reconcile(&mut task, raw, 2_000_000);
    assert_eq!(task.status, TaskStatus::Review);
    assert_eq!(task.output.as_deref(), Some(NO_OUTPUT_PLACEHOLDER));
}

#[test]
fn output_is_sanitized_before_classification() {
    let mut task = running();

    reconcile(
        &mut task,
        Some("\x1b[1m[QUESTION]:\x1b[0m \x1b[33mstaging or prod?\x1b[0m\r\n"),
        2_000_000,
    );

    assert_eq!(task.status, TaskStatus::Question);
    assert_eq!(task.question.as_deref(), Some("staging or prod?"));
}

#[test]
fn long_output_keeps_the_tail() {
    let mut task = running();
    let raw = format!("{}END", "x".repeat(MAX_OUTPUT_CHARS * 2));

    reconcile(&mut task, Some(&raw), 2_000_000);

    let output = task.output.unwrap();
    assert_eq!(output.chars().count(), MAX_OUTPUT_CHARS);
    assert!(output.ends_with("END"));
}

#[test]
fn rerun_clears_previous_question() {
    let mut task = Task::builder()
        .status(TaskStatus::Running)
        .question("old question")
        .build();

    reconcile(&mut task, Some("answered and done"), 2_000_000);

    assert_eq!(task.status, TaskStatus::Review);
    assert_eq!(task.question, None);
}

#[parameterized(
    pending = { TaskStatus::Pending },
    review = { TaskStatus::Review },
    question = { TaskStatus::Question },
    completed = { TaskStatus::Completed },
)]
fn non_running_task_is_untouched(status: TaskStatus) {
    let mut task = Task::builder().status(status).output("kept").build();
    let before = task.clone();

    assert!(!reconcile(&mut task, Some("[QUESTION]: late?"), 2_000_000));

    assert_eq!(task, before);
}

#[test]
fn second_reconcile_is_a_no_op() {
    let mut task = running();
    assert!(reconcile(&mut task, Some("first"), 2_000_000));
    let after_first = task.clone();

    assert!(!reconcile(&mut task, Some("second"), 3_000_000));

    assert_eq!(task, after_first);
    assert_eq!(task.history.len(), 1);
}

#[parameterized(
    no_marker = { "all good", None },
    marker_mid_line = { "note: [QUESTION]: not anchored", None },
    indented_marker = { "  [QUESTION]: indented", None },
    blank_marker = { "[QUESTION]:   ", None },
    first_blank_then_real = { "[QUESTION]:\n[QUESTION]: real one", Some("real one") },
    first_of_two = { "[QUESTION]: a\n[QUESTION]: b", Some("a") },
    no_space = { "[QUESTION]:why", Some("why") },
)]
fn question_extraction(output: &str, expected: Option<&str>) {
    assert_eq!(extract_question(output).as_deref(), expected);
}

proptest! {
    #[test]
    fn question_status_always_has_question(raw in proptest::option::of("(\\PC|\n|\\[QUESTION\\]: ?){0,40}")) {
        let mut task = running();
        reconcile(&mut task, raw.as_deref(), 2_000_000);

        prop_assert!(matches!(task.status, TaskStatus::Review | TaskStatus::Question));
        if task.status == TaskStatus::Question {
            prop_assert!(task.question.as_deref().is_some_and(|q| !q.trim().is_empty()));
            prop_assert_eq!(task.last_entry().map(|e| e.role), Some(Role::Worker));
        } else {
            prop_assert!(task.question.is_none());
        }
        prop_assert!(task.output.as_deref().is_some_and(|o| o.chars().count() <= MAX_OUTPUT_CHARS));
    }
}

#[parameterized(
    missing = { None, UNSUPERVISED_PLACEHOLDER },
    empty = { Some(""), UNSUPERVISED_PLACEHOLDER },
    whitespace = { Some("  \n\t\n"), UNSUPERVISED_PLACEHOLDER },
    control_only = { Some("\x1b[2J\x1b[0m\r\n"), UNSUPERVISED_PLACEHOLDER },
    real_log = { Some("partial work\n"), "partial work\n" },
)]
fn unsupervised_output_falls_back_on_blank_log(log: Option<&str>, expected: &str) {
    assert_eq!(unsupervised_output(log.map(str::to_string)), expected);
}

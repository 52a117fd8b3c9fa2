//! Daemon task specs
//!
//! Drive a task through the daemon end to end with a scripted worker.

use crate::prelude::*;
use serde_json::json;

fn configure(ws: &Workspace, script: &str) {
    ws.state_file(
        "config.json",
        &json!({
            "poll_interval_secs": 1,
            "work_dir": ws.work_path(),
            "worker": { "program": "/bin/sh", "args": ["-c", script] },
        }),
    );
}

fn task_status(ws: &Workspace, id: &str) -> Option<String> {
    ws.tasks()?
        .into_iter()
        .find(|t| t["id"] == id)
        .and_then(|t| t["status"].as_str().map(str::to_string))
}

#[test]
fn pending_task_is_run_and_lands_in_review() {
    let mut ws = Workspace::new();
    configure(&ws, "printf 'done.\\n'");
    ws.state_file(
        "tasks.json",
        &tasks_file(json!([task_record("t1", "fix bug", "pending")])),
    );

    let pid = ws.start();

    let reviewed = wait_for(SPEC_WAIT_MAX_MS, || {
        task_status(&ws, "t1").as_deref() == Some("review")
    });
    assert!(reviewed, "daemon log:\n{}", ws.daemon_log());
    let task = ws.tasks().unwrap().remove(0);
    assert_eq!(task["output"], "done.");
    assert_eq!(task["history"][0]["role"], "worker");

    ws.stop(pid);
}

#[test]
fn worker_question_lands_in_question() {
    let mut ws = Workspace::new();
    configure(&ws, "printf '[QUESTION]: which env?\\n'");
    ws.state_file(
        "tasks.json",
        &tasks_file(json!([task_record("t1", "deploy", "pending")])),
    );

    let pid = ws.start();

    let asked = wait_for(SPEC_WAIT_MAX_MS, || {
        task_status(&ws, "t1").as_deref() == Some("question")
    });
    assert!(asked, "daemon log:\n{}", ws.daemon_log());
    assert_eq!(ws.tasks().unwrap()[0]["question"], "which env?");

    ws.stop(pid);
}

#[test]
fn orphaned_running_task_is_rerun_after_restart() {
    let mut ws = Workspace::new();
    configure(&ws, "printf 'second attempt\\n'");
    ws.state_file(
        "tasks.json",
        &tasks_file(json!([task_record("t1", "fix bug", "running")])),
    );

    let pid = ws.start();

    let reviewed = wait_for(SPEC_WAIT_MAX_MS, || {
        task_status(&ws, "t1").as_deref() == Some("review")
    });
    assert!(reviewed, "daemon log:\n{}", ws.daemon_log());
    assert_eq!(ws.tasks().unwrap()[0]["output"], "second attempt");

    ws.stop(pid);
}

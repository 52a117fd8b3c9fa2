// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tokio::process::Command;

fn sh(script: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", script]);
    cmd
}

#[tokio::test]
async fn output_is_captured() {
    let output = run_with_timeout(sh("echo hello"), Duration::from_secs(5), "echo")
        .await
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
}

#[tokio::test]
async fn nonzero_exit_is_not_an_error() {
    let output = run_with_timeout(sh("exit 3"), Duration::from_secs(5), "exit")
        .await
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
}

#[tokio::test]
async fn missing_binary_names_the_call() {
    let cmd = Command::new("/nonexistent/binary");
    let err = run_with_timeout(cmd, Duration::from_secs(5), "tmux -V")
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::Spawn { .. }));
    assert!(err.to_string().starts_with("tmux -V could not run:"), "got: {err}");
}

#[tokio::test]
async fn slow_command_times_out() {
    let err = run_with_timeout(sh("sleep 10"), Duration::from_millis(100), "test sleep")
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::TimedOut { .. }));
    assert_eq!(err.to_string(), "test sleep timed out after 100ms");
}

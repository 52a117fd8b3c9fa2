//! Daemon lifecycle specs
//!
//! Verify startup, the single-instance lock, and graceful shutdown.

use crate::prelude::*;

#[test]
fn daemon_writes_pid_and_startup_marker() {
    let mut ws = Workspace::new();
    let pid = ws.start();

    let pid_file = std::fs::read_to_string(ws.state_path().join("daemon.pid")).unwrap();
    assert_eq!(pid_file.trim(), pid.to_string());
    assert!(ws
        .daemon_log()
        .contains(&format!("--- fmd: starting (pid: {pid}) ---")));
    assert!(ws.state_path().join("scratch").is_dir());

    ws.stop(pid);
}

#[test]
fn second_daemon_refuses_to_start() {
    let mut ws = Workspace::new();
    let pid = ws.start();

    let output = ws.fmd().output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("fmd is already running"), "got: {stderr}");
    assert!(stderr.contains(&format!("pid: {pid}")), "got: {stderr}");

    ws.stop(pid);
}

#[test]
fn sigterm_stops_daemon_and_releases_lock() {
    let mut ws = Workspace::new();
    let pid = ws.start();

    let status = ws.stop(pid);

    assert!(status.success(), "daemon log:\n{}", ws.daemon_log());
    assert!(!ws.state_path().join("daemon.pid").exists());
    assert!(ws.daemon_log().contains("Daemon stopped"));

    // The lock is free again
    let pid = ws.start();
    ws.stop(pid);
}

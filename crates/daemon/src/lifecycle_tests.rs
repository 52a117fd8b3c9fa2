// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn paths_live_under_state_dir() {
    let paths = Paths::under(PathBuf::from("/var/fm"));

    assert_eq!(paths.lock_path, Path::new("/var/fm/daemon.pid"));
    assert_eq!(paths.log_path, Path::new("/var/fm/daemon.log"));
    assert_eq!(paths.scratch_path, Path::new("/var/fm/scratch"));
}

#[test]
fn lock_writes_pid() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("daemon.pid");

    let _lock = acquire_lock(&path).unwrap();

    let pid = std::fs::read_to_string(&path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
}

#[test]
fn second_lock_fails_and_keeps_pid() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("daemon.pid");
    let _lock = acquire_lock(&path).unwrap();

    let err = acquire_lock(&path).unwrap_err();

    assert!(matches!(err, LifecycleError::LockFailed(_)));
    let pid = std::fs::read_to_string(&path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
}

#[test]
fn lock_is_released_on_drop() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("daemon.pid");

    drop(acquire_lock(&path).unwrap());

    assert!(acquire_lock(&path).is_ok());
}

#[tokio::test]
async fn startup_creates_layout_and_refuses_second_instance() {
    let dir = tempdir().unwrap();
    let paths = Paths::under(dir.path().join("state"));

    let StartupResult { daemon, .. } = startup(&paths).await.unwrap();

    assert!(paths.scratch_path.is_dir());
    assert!(paths.lock_path.exists());
    assert!(!daemon.supervisor.scheduler_status().running);
    assert!(matches!(
        startup(&paths).await,
        Err(LifecycleError::LockFailed(_))
    ));

    daemon.shutdown();
    assert!(!paths.lock_path.exists());
}

#[tokio::test]
async fn startup_loads_persisted_tasks() {
    let dir = tempdir().unwrap();
    let paths = Paths::under(dir.path().to_path_buf());

    {
        let StartupResult { mut daemon, .. } = startup(&paths).await.unwrap();
        daemon
            .supervisor
            .create_task("fix bug", "the build is red")
            .await
            .unwrap();
        daemon.shutdown();
    }

    let StartupResult { mut daemon, .. } = startup(&paths).await.unwrap();
    let tasks = daemon.supervisor.list_tasks().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "fix bug");
    daemon.shutdown();
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn fake_session_spawn_records_call_and_log() {
    let adapter = FakeSessionAdapter::new();
    let id = adapter
        .spawn(
            "fm-abc",
            Path::new("/tmp"),
            "echo hello",
            Some(Path::new("/tmp/fm-abc.log")),
        )
        .await
        .unwrap();

    assert_eq!(id, "fm-abc");
    let session = adapter.get_session(&id).unwrap();
    assert_eq!(session.log, Some(PathBuf::from("/tmp/fm-abc.log")));

    let calls = adapter.calls();
    assert_eq!(calls.len(), 1);
    assert!(matches!(calls[0], SessionCall::Spawn { .. }));
}

#[tokio::test]
async fn fake_session_lifecycle() {
    let adapter = FakeSessionAdapter::new();
    let id = adapter
        .spawn("fm-abc", Path::new("/tmp"), "cmd", None)
        .await
        .unwrap();

    assert!(adapter.is_alive(&id).await.unwrap());

    adapter.set_exited(&id);
    assert!(!adapter.is_alive(&id).await.unwrap());
}

#[tokio::test]
async fn fake_session_kill_marks_dead() {
    let adapter = FakeSessionAdapter::new();
    adapter.add_session("fm-abc", true);

    adapter.kill("fm-abc").await.unwrap();

    assert!(!adapter.is_alive("fm-abc").await.unwrap());
    assert!(adapter.calls().contains(&SessionCall::Kill {
        id: "fm-abc".to_string()
    }));
}

#[tokio::test]
async fn fake_session_unknown_is_not_alive() {
    let adapter = FakeSessionAdapter::new();
    assert!(!adapter.is_alive("fm-missing").await.unwrap());
}

#[tokio::test]
async fn fake_session_spawn_failure() {
    let adapter = FakeSessionAdapter::new();
    adapter.fail_spawn("no server running");

    let result = adapter.spawn("fm-abc", Path::new("/tmp"), "cmd", None).await;

    assert!(matches!(result, Err(SessionError::SpawnFailed(m)) if m == "no server running"));
    assert!(adapter.get_session("fm-abc").is_none());
}

#[tokio::test]
async fn fake_session_query_failure() {
    let adapter = FakeSessionAdapter::new();
    adapter.add_session("fm-abc", true);
    adapter.fail_queries("tmux hung");

    let result = adapter.is_alive("fm-abc").await;
    assert!(matches!(result, Err(SessionError::CommandFailed(_))));
}

#[tokio::test]
async fn fake_session_availability_toggle() {
    let adapter = FakeSessionAdapter::new();
    assert!(adapter.is_available().await);
    adapter.set_available(false);
    assert!(!adapter.is_available().await);
}

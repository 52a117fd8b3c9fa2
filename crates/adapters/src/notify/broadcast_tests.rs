// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn subscribers_receive_snapshots() {
    let sink = BroadcastChangeSink::default();
    let mut rx = sink.subscribe();
    let task = Task::builder().title("write docs").build();

    sink.tasks_changed(std::slice::from_ref(&task)).await.unwrap();

    let snapshot = rx.recv().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].title, "write docs");
}

#[tokio::test]
async fn publishing_without_subscribers_is_ok() {
    let sink = BroadcastChangeSink::new(1);
    assert!(sink.tasks_changed(&[]).await.is_ok());
}

#[tokio::test]
async fn late_subscriber_sees_only_later_snapshots() {
    let sink = BroadcastChangeSink::default();
    sink.tasks_changed(&[Task::builder().build()]).await.unwrap();

    let mut rx = sink.subscribe();
    sink.tasks_changed(&[]).await.unwrap();

    let snapshot = rx.recv().await.unwrap();
    assert!(snapshot.is_empty());
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::borrow::Borrow;
use std::collections::HashMap;

#[test]
fn task_id_displays_and_compares_as_str() {
    let id = TaskId::new("1a2b3c4d");
    assert_eq!(id.to_string(), "1a2b3c4d");
    assert_eq!(id.as_str(), "1a2b3c4d");
    assert_eq!(id, *"1a2b3c4d");
    assert_eq!(id, "1a2b3c4d");
    assert_eq!(TaskId::from("x"), TaskId::from("x".to_string()));
}

#[test]
fn task_id_keys_can_be_looked_up_by_str() {
    let mut map = HashMap::new();
    map.insert(TaskId::new("k"), 42);
    assert_eq!(map.get("k"), Some(&42));

    let id = TaskId::new("key");
    let borrowed: &str = id.borrow();
    assert_eq!(borrowed, "key");
}

#[test]
fn task_id_serializes_as_plain_string() {
    let id = TaskId::new("1a2b3c4d");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"1a2b3c4d\"");
    let parsed: TaskId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn uuid_id_gen_is_short_hex() {
    let gen = UuidIdGen;
    let id = gen.next();
    assert_eq!(id.len(), TASK_ID_LEN);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()), "got {id}");
    assert_ne!(gen.next(), gen.next());
}

#[test]
fn sequential_id_gen_counts_from_one() {
    let gen = SequentialIdGen::new("t");
    assert_eq!(gen.next(), "t-1");
    assert_eq!(gen.clone().next(), "t-2");
    assert_eq!(SequentialIdGen::default().next(), "task-1");
}

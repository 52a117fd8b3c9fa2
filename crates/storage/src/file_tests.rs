// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::BTreeMap;
use std::io::Write;
use tempfile::tempdir;

type Doc = BTreeMap<String, u32>;

fn doc(n: u32) -> Doc {
    BTreeMap::from([("n".to_string(), n)])
}

#[test]
fn write_then_read() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested/doc.json");

    write_atomic(&path, &doc(1)).unwrap();

    let loaded: Option<Doc> = read_or_quarantine(&path).unwrap();
    assert_eq!(loaded, Some(doc(1)));
}

#[test]
fn read_missing_is_none() {
    let dir = tempdir().unwrap();
    let loaded: Option<Doc> = read_or_quarantine(&dir.path().join("missing.json")).unwrap();
    assert!(loaded.is_none());
}

#[test]
fn write_leaves_no_tmp_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.json");

    write_atomic(&path, &doc(1)).unwrap();

    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn write_replaces_previous_content() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.json");

    write_atomic(&path, &doc(1)).unwrap();
    write_atomic(&path, &doc(2)).unwrap();

    let loaded: Option<Doc> = read_or_quarantine(&path).unwrap();
    assert_eq!(loaded, Some(doc(2)));
}

#[yare::parameterized(
    truncated = { "{not json" },
    empty = { "" },
    wrong_shape = { "[1, 2, 3]" },
    wrong_value_type = { r#"{"n": "one"}"# },
)]
fn corrupt_file_moved_to_bak(content: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.json");
    {
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    let loaded: Option<Doc> = read_or_quarantine(&path).unwrap();

    assert!(loaded.is_none());
    assert!(!path.exists());
    assert_eq!(
        fs::read_to_string(path.with_extension("bak")).unwrap(),
        content
    );
}

#[test]
fn bak_rotation_keeps_three() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.json");

    for i in 0..5 {
        fs::write(&path, format!("garbage {i}")).unwrap();
        let _: Option<Doc> = read_or_quarantine(&path).unwrap();
    }

    assert_eq!(
        fs::read_to_string(path.with_extension("bak")).unwrap(),
        "garbage 4"
    );
    assert_eq!(
        fs::read_to_string(path.with_extension("bak.2")).unwrap(),
        "garbage 3"
    );
    assert_eq!(
        fs::read_to_string(path.with_extension("bak.3")).unwrap(),
        "garbage 2"
    );
    assert!(!path.with_extension("bak.4").exists());
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON documents on disk: replaced atomically, quarantined when unreadable.

use crate::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Quarantined copies kept per document: `.bak`, `.bak.2`, `.bak.3`
const QUARANTINE_SLOTS: u32 = 3;

/// Replace `path` with the pretty-printed JSON of `value`.
///
/// The bytes go to a sibling `.tmp` file that is fsynced and then renamed
/// over `path`, so readers see either the old document or the new one.
pub(crate) fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let staging = path.with_extension("tmp");
    let mut out = BufWriter::new(File::create(&staging)?);
    serde_json::to_writer_pretty(&mut out, value)?;
    out.write_all(b"\n")?;
    out.into_inner().map_err(|e| e.into_error())?.sync_all()?;

    fs::rename(&staging, path)?;
    Ok(())
}

/// Read and parse `path`.
///
/// A missing file is `Ok(None)`. So is one that fails to parse, after it
/// has been moved aside to a `.bak` slot.
pub(crate) fn read_or_quarantine<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let error = match serde_json::from_slice(&bytes) {
        Ok(value) => return Ok(Some(value)),
        Err(e) => e,
    };

    let slot = free_quarantine_slot(path);
    warn!(
        %error,
        path = %path.display(),
        moved_to = %slot.display(),
        "unreadable state file, starting empty",
    );
    fs::rename(path, &slot)?;
    Ok(None)
}

/// Shift existing quarantine files down one slot and return the first slot.
/// Whatever sat in the last slot is deleted.
fn free_quarantine_slot(path: &Path) -> PathBuf {
    let slot = |n: u32| match n {
        1 => path.with_extension("bak"),
        n => path.with_extension(format!("bak.{n}")),
    };

    let _ = fs::remove_file(slot(QUARANTINE_SLOTS));
    for n in (1..QUARANTINE_SLOTS).rev() {
        let from = slot(n);
        if from.exists() {
            let _ = fs::rename(&from, slot(n + 1));
        }
    }
    slot(1)
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;

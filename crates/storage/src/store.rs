// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task repository backed by JSON files in the state directory.

use crate::file::{read_or_quarantine, write_atomic};
use crate::StoreError;
use chrono::{DateTime, Utc};
use fm_core::{Config, Task};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// On-disk format version of `tasks.json`
pub const TASKS_FILE_VERSION: u32 = 1;

/// Where tasks and config live between runs
pub trait TaskStore: Send + 'static {
    fn load_all(&mut self) -> Result<Vec<Task>, StoreError>;
    fn save_all(&mut self, tasks: &[Task]) -> Result<(), StoreError>;
    fn load_config(&mut self) -> Result<Config, StoreError>;
    fn save_config(&mut self, config: &Config) -> Result<(), StoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct TasksFile {
    version: u32,
    saved_at: DateTime<Utc>,
    tasks: Vec<Task>,
}

/// `tasks.json` and `config.json` under one directory.
///
/// The task list is cached in memory so fields that are never written to
/// disk (the worker reference) survive between `load_all` calls. When the
/// file is changed by another writer it is re-read and those fields are
/// carried over by task id.
pub struct JsonTaskStore {
    tasks_path: PathBuf,
    config_path: PathBuf,
    cache: Option<Vec<Task>>,
    seen_mtime: Option<SystemTime>,
}

impl JsonTaskStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            tasks_path: dir.join("tasks.json"),
            config_path: dir.join("config.json"),
            cache: None,
            seen_mtime: None,
        }
    }

    pub fn tasks_path(&self) -> &Path {
        &self.tasks_path
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    fn disk_mtime(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.tasks_path)
            .and_then(|m| m.modified())
            .ok()
    }

    fn read_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let Some(file) = read_or_quarantine::<TasksFile>(&self.tasks_path)? else {
            return Ok(Vec::new());
        };
        if file.version != TASKS_FILE_VERSION {
            tracing::warn!(
                version = file.version,
                expected = TASKS_FILE_VERSION,
                "unexpected tasks file version, reading anyway"
            );
        }
        Ok(file.tasks)
    }
}

fn carry_transient(mut fresh: Vec<Task>, previous: Option<&[Task]>) -> Vec<Task> {
    let Some(previous) = previous else {
        return fresh;
    };
    for task in &mut fresh {
        if let Some(old) = previous.iter().find(|old| old.id == task.id) {
            task.worker = old.worker.clone();
        }
    }
    fresh
}

impl TaskStore for JsonTaskStore {
    fn load_all(&mut self) -> Result<Vec<Task>, StoreError> {
        let mtime = self.disk_mtime();
        if let Some(cache) = &self.cache {
            if mtime == self.seen_mtime {
                return Ok(cache.clone());
            }
            tracing::info!(path = %self.tasks_path.display(), "tasks file changed on disk, reloading");
        }

        let fresh = carry_transient(self.read_tasks()?, self.cache.as_deref());
        self.cache = Some(fresh.clone());
        // Re-stat: quarantine may have moved the file
        self.seen_mtime = self.disk_mtime();
        Ok(fresh)
    }

    fn save_all(&mut self, tasks: &[Task]) -> Result<(), StoreError> {
        let file = TasksFile {
            version: TASKS_FILE_VERSION,
            saved_at: Utc::now(),
            tasks: tasks.to_vec(),
        };
        write_atomic(&self.tasks_path, &file)?;
        self.cache = Some(file.tasks);
        self.seen_mtime = self.disk_mtime();
        tracing::debug!(count = tasks.len(), "tasks saved");
        Ok(())
    }

    fn load_config(&mut self) -> Result<Config, StoreError> {
        Ok(read_or_quarantine(&self.config_path)?.unwrap_or_default())
    }

    fn save_config(&mut self, config: &Config) -> Result<(), StoreError> {
        write_atomic(&self.config_path, config)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

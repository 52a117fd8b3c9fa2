// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime configuration for the supervisor.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default scheduler polling interval in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Longest accepted polling interval (one day).
pub const MAX_POLL_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Errors from config validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("poll interval must be greater than zero")]
    ZeroInterval,
    #[error("poll interval must be at most {max} seconds")]
    IntervalTooLong { max: u64 },
    #[error("worker program must not be empty")]
    EmptyProgram,
}

/// Command line used to invoke the worker.
///
/// The prompt is appended as the final argument, never word-split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for WorkerCommand {
    fn default() -> Self {
        Self {
            program: "claude".to_string(),
            args: vec![
                "--print".to_string(),
                "--dangerously-skip-permissions".to_string(),
            ],
        }
    }
}

/// Process-wide supervisor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Seconds between scheduler ticks
    pub poll_interval_secs: u64,
    /// Directory workers run in; resolved to an absolute path at dispatch
    pub work_dir: PathBuf,
    #[serde(default)]
    pub worker: WorkerCommand,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            work_dir: PathBuf::from("."),
            worker: WorkerCommand::default(),
        }
    }
}

/// Partial config update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
    #[serde(default)]
    pub worker: Option<WorkerCommand>,
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.poll_interval_secs > MAX_POLL_INTERVAL_SECS {
            return Err(ConfigError::IntervalTooLong {
                max: MAX_POLL_INTERVAL_SECS,
            });
        }
        if self.worker.program.trim().is_empty() {
            return Err(ConfigError::EmptyProgram);
        }
        Ok(())
    }

    /// Apply a partial update, returning the new config if it is valid.
    ///
    /// `self` is untouched when validation fails.
    pub fn merged(&self, update: ConfigUpdate) -> Result<Config, ConfigError> {
        let mut next = self.clone();
        if let Some(secs) = update.poll_interval_secs {
            next.poll_interval_secs = secs;
        }
        if let Some(dir) = update.work_dir {
            next.work_dir = dir;
        }
        if let Some(worker) = update.worker {
            next.worker = worker;
        }
        next.validate()?;
        Ok(next)
    }

    /// Working directory as an absolute path, with `~/` expanded.
    pub fn resolved_work_dir(&self) -> PathBuf {
        resolve_dir(&self.work_dir)
    }
}

fn resolve_dir(dir: &Path) -> PathBuf {
    let expanded = match dir.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => dir.to_path_buf(),
        },
        Err(_) => dir.to_path_buf(),
    };
    std::path::absolute(&expanded).unwrap_or(expanded)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

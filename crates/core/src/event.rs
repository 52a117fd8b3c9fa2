// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Completion notices sent from worker handles to the supervisor loop.
//!
//! Both backends report through the same channel so that completions are
//! applied one at a time, in between scheduler ticks, by the single owner of
//! the task state.

use crate::task::TaskId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A direct child process exited and its pipes are drained.
    WorkerExited {
        task_id: TaskId,
        run: u64,
        output: String,
    },
    /// The liveness poll found a worker's tmux session gone.
    SessionEnded { task_id: TaskId, run: u64 },
}

impl Event {
    pub fn task_id(&self) -> &TaskId {
        match self {
            Event::WorkerExited { task_id, .. } | Event::SessionEnded { task_id, .. } => task_id,
        }
    }

    /// Handle generation the event belongs to.
    pub fn run(&self) -> u64 {
        match self {
            Event::WorkerExited { run, .. } | Event::SessionEnded { run, .. } => *run,
        }
    }

    pub fn log_summary(&self) -> String {
        match self {
            Event::WorkerExited {
                task_id,
                run,
                output,
            } => format!(
                "worker:exited task={task_id} run={run} output_len={}",
                output.len()
            ),
            Event::SessionEnded { task_id, run } => {
                format!("session:ended task={task_id} run={run}")
            }
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;

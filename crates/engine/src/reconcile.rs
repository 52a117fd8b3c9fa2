// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Completion reconciler: turns a finished worker's raw output into a
//! classified, bounded task result.

use crate::prompt::QUESTION_MARKER;
use fm_core::{sanitize, truncate_tail, Task, TaskStatus, MAX_OUTPUT_CHARS};

/// Substituted when no output reached the supervisor
pub const NO_OUTPUT_PLACEHOLDER: &str = "[no output captured]";

/// Substituted when a session ended while no supervisor was watching and
/// left no usable log behind
pub const UNSUPERVISED_PLACEHOLDER: &str = "[session ended while unsupervised]";

/// Output for a session that ended while no supervisor was watching: its
/// surviving log, or [`UNSUPERVISED_PLACEHOLDER`] when the log is missing
/// or holds nothing printable.
pub fn unsupervised_output(log: Option<String>) -> String {
    log.filter(|text| !sanitize(text).trim().is_empty())
        .unwrap_or_else(|| UNSUPERVISED_PLACEHOLDER.to_string())
}

/// Finish a running task with `raw` output.
///
/// Returns false and leaves the task untouched unless it is `running`, so
/// a late exit event and a tick can both call this safely.
pub fn reconcile(task: &mut Task, raw: Option<&str>, epoch_ms: u64) -> bool {
    if task.status != TaskStatus::Running {
        return false;
    }

    let cleaned = sanitize(raw.unwrap_or_default());
    let trimmed = cleaned.trim();
    let output = if trimmed.is_empty() {
        NO_OUTPUT_PLACEHOLDER.to_string()
    } else {
        truncate_tail(trimmed, MAX_OUTPUT_CHARS)
    };
    let question = extract_question(&output);

    match task.finish(output, question, epoch_ms) {
        Ok(()) => {
            tracing::info!(task_id = %task.id, status = %task.status, "task reconciled");
            true
        }
        Err(e) => {
            tracing::warn!(task_id = %task.id, error = %e, "reconcile rejected");
            false
        }
    }
}

/// Text of the first non-blank `[QUESTION]:` line, anchored at line start.
pub fn extract_question(output: &str) -> Option<String> {
    output
        .lines()
        .filter_map(|line| line.strip_prefix(QUESTION_MARKER))
        .map(str::trim)
        .find(|q| !q.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;

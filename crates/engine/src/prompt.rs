// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt sent to the worker for one dispatch

use fm_core::{Role, Task};
use std::fmt::Write;

/// Line prefix a worker uses to ask the user a question instead of
/// finishing the task.
pub const QUESTION_MARKER: &str = "[QUESTION]:";

/// Build the prompt for `task`.
///
/// Includes the title and description, the transcript of earlier rounds
/// and the latest feedback when there are any, and the instruction for
/// asking a clarifying question.
pub fn build_prompt(task: &Task) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "# Task: {}", task.title.trim());
    let description = task.description.trim();
    if !description.is_empty() {
        let _ = writeln!(prompt, "\n{}", description);
    }

    if !task.history.is_empty() {
        let _ = writeln!(prompt, "\n## Previous rounds");
        for entry in &task.history {
            let speaker = match entry.role {
                Role::Worker => "Worker",
                Role::User => "User",
            };
            let _ = writeln!(prompt, "\n### {}\n{}", speaker, entry.content.trim_end());
        }
    }

    if let Some(feedback) = task.feedback.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        let _ = writeln!(prompt, "\n## Latest feedback\n{}", feedback);
    }

    let _ = write!(
        prompt,
        "\n## Instructions\n\
         Complete the task in the current directory. When you are done, summarize what you changed.\n\
         If you cannot continue without an answer from the user, reply with a single line starting with \
         `{}` followed by your question, and stop.\n",
        QUESTION_MARKER
    );
    prompt
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;

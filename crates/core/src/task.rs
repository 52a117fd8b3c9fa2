// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task record and lifecycle state machine.
//!
//! A task moves `pending → running → review | question`, and from there back
//! to `pending` (with user feedback) or on to `completed`. Every edge is owned
//! by exactly one trigger: the scheduler dispatches, the worker finishes, the
//! user decides. [`check_transition`] is the single source of truth for which
//! edges exist.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use crate::id::TaskId;

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting to be dispatched on the next tick
    Pending,
    /// A worker is in flight
    Running,
    /// Worker finished; waiting for the user to approve or reject
    Review,
    /// Worker asked a question; waiting for the user's answer
    Question,
    /// Approved by the user
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Pending,
        TaskStatus::Running,
        TaskStatus::Review,
        TaskStatus::Question,
        TaskStatus::Completed,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Review => write!(f, "review"),
            TaskStatus::Question => write!(f, "question"),
            TaskStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Who is allowed to request a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Scheduler,
    Worker,
    User,
}

/// Errors from lifecycle transitions
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },
    #[error("transition from {from} to {to} requires non-empty feedback")]
    MissingFeedback { from: TaskStatus, to: TaskStatus },
}

/// Validate a transition against the lifecycle table.
///
/// Returns the trigger that owns the edge. The only guard checked here is
/// feedback on the user edges back to `pending`; the question-text guard on
/// `running → question` is enforced by the reconciler, which is the only
/// caller that can supply it.
pub fn check_transition(
    from: TaskStatus,
    to: TaskStatus,
    feedback: Option<&str>,
) -> Result<Trigger, TransitionError> {
    use TaskStatus::*;

    let trigger = match (from, to) {
        (Pending, Running) => Trigger::Scheduler,
        (Running, Review) | (Running, Question) => Trigger::Worker,
        (Review, Completed) => Trigger::User,
        (Review, Pending) | (Question, Pending) => {
            if !feedback.is_some_and(|f| !f.trim().is_empty()) {
                return Err(TransitionError::MissingFeedback { from, to });
            }
            Trigger::User
        }
        _ => return Err(TransitionError::InvalidTransition { from, to }),
    };
    Ok(trigger)
}

/// Author of a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Worker,
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Worker => write!(f, "worker"),
            Role::User => write!(f, "user"),
        }
    }
}

/// One turn of the task transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

/// In-memory pointer to the worker serving a running task.
///
/// Never persisted: after a restart the registry is rebuilt from tmux, not
/// from this field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerRef {
    Process { run: u64, pid: Option<u32> },
    Session { run: u64, session: String },
}

impl WorkerRef {
    pub fn run(&self) -> u64 {
        match self {
            WorkerRef::Process { run, .. } | WorkerRef::Session { run, .. } => *run,
        }
    }
}

/// A unit of work and its result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    /// Sanitized, tail-truncated output of the latest worker run
    #[serde(default)]
    pub output: Option<String>,
    /// Set only while `status == Question`
    #[serde(default)]
    pub question: Option<String>,
    /// Latest user feedback, sent with the next dispatch
    #[serde(default)]
    pub feedback: Option<String>,
    /// Append-only transcript across review rounds
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(skip)]
    pub worker: Option<WorkerRef>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

impl Task {
    pub fn new(
        id: impl Into<TaskId>,
        title: impl Into<String>,
        description: impl Into<String>,
        epoch_ms: u64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            status: TaskStatus::Pending,
            output: None,
            question: None,
            feedback: None,
            history: Vec::new(),
            worker: None,
            created_at_ms: epoch_ms,
            updated_at_ms: epoch_ms,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Scheduler edge: `pending → running`.
    ///
    /// `worker` is `None` when the worker could not be started; the caller
    /// then finishes the task with the error straight away.
    pub fn mark_running(
        &mut self,
        worker: Option<WorkerRef>,
        epoch_ms: u64,
    ) -> Result<(), TransitionError> {
        check_transition(self.status, TaskStatus::Running, None)?;
        self.status = TaskStatus::Running;
        self.worker = worker;
        self.updated_at_ms = epoch_ms;
        Ok(())
    }

    /// Worker edges: `running → review` or `running → question`.
    ///
    /// A blank question is treated as no question so that a task in
    /// `question` always carries one.
    pub fn finish(
        &mut self,
        output: String,
        question: Option<String>,
        epoch_ms: u64,
    ) -> Result<(), TransitionError> {
        let question = question.filter(|q| !q.trim().is_empty());
        let to = if question.is_some() {
            TaskStatus::Question
        } else {
            TaskStatus::Review
        };
        check_transition(self.status, to, None)?;

        self.status = to;
        self.question = question;
        self.history.push(HistoryEntry {
            role: Role::Worker,
            content: output.clone(),
        });
        self.output = Some(output);
        self.worker = None;
        self.updated_at_ms = epoch_ms;
        Ok(())
    }

    /// User edges: approve, reject with feedback, or answer a question.
    ///
    /// Scheduler and worker edges are rejected here even though they exist
    /// in the table, so a user request cannot skip dispatch or review.
    pub fn apply_user_transition(
        &mut self,
        to: TaskStatus,
        feedback: Option<&str>,
        epoch_ms: u64,
    ) -> Result<(), TransitionError> {
        let from = self.status;
        if check_transition(from, to, feedback)? != Trigger::User {
            return Err(TransitionError::InvalidTransition { from, to });
        }

        if to == TaskStatus::Pending {
            let feedback = feedback.map(str::trim).unwrap_or_default().to_string();
            self.history.push(HistoryEntry {
                role: Role::User,
                content: feedback.clone(),
            });
            self.feedback = Some(feedback);
            self.question = None;
        }
        self.status = to;
        self.updated_at_ms = epoch_ms;
        Ok(())
    }

    /// Put a running task back in the queue after its worker was lost.
    ///
    /// Not a lifecycle edge: used only when a direct-process worker cannot be
    /// recovered after a supervisor restart, so the task is re-run.
    pub fn requeue(&mut self, epoch_ms: u64) {
        self.status = TaskStatus::Pending;
        self.worker = None;
        self.updated_at_ms = epoch_ms;
    }

    /// Most recent history entry
    pub fn last_entry(&self) -> Option<&HistoryEntry> {
        self.history.last()
    }
}

/// Builder for `Task` with test defaults.
#[cfg(any(test, feature = "test-support"))]
pub struct TaskBuilder {
    task: Task,
}

#[cfg(any(test, feature = "test-support"))]
impl TaskBuilder {
    pub fn id(mut self, v: impl Into<String>) -> Self {
        self.task.id = TaskId::new(v);
        self
    }
    pub fn title(mut self, v: impl Into<String>) -> Self {
        self.task.title = v.into();
        self
    }
    pub fn description(mut self, v: impl Into<String>) -> Self {
        self.task.description = v.into();
        self
    }
    pub fn status(mut self, v: TaskStatus) -> Self {
        self.task.status = v;
        self
    }
    pub fn output(mut self, v: impl Into<String>) -> Self {
        self.task.output = Some(v.into());
        self
    }
    pub fn question(mut self, v: impl Into<String>) -> Self {
        self.task.question = Some(v.into());
        self
    }
    pub fn feedback(mut self, v: impl Into<String>) -> Self {
        self.task.feedback = Some(v.into());
        self
    }
    pub fn entry(mut self, role: Role, content: impl Into<String>) -> Self {
        self.task.history.push(HistoryEntry {
            role,
            content: content.into(),
        });
        self
    }
    pub fn build(self) -> Task {
        self.task
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Task {
    /// Create a builder with test defaults.
    pub fn builder() -> TaskBuilder {
        TaskBuilder {
            task: Task::new("task-1", "fix bug", "the build is red", 1_000_000),
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the supervisor

use fm_core::{ConfigError, TaskId, TransitionError};
use fm_storage::StoreError;
use thiserror::Error;

/// Errors returned by supervisor operations
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    #[error("task title must not be empty")]
    EmptyTitle,
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

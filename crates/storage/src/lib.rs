// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Storage layer for Foreman

mod file;
mod store;

#[cfg(any(test, feature = "test-support"))]
mod memory;

pub use store::{JsonTaskStore, TaskStore, TASKS_FILE_VERSION};

#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryTaskStore;

use thiserror::Error;

/// Errors that can occur reading or writing the state directory
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

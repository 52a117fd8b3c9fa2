// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Foreman supervision engine

mod error;
pub mod prompt;
pub mod reconcile;
mod registry;
mod scheduler;
mod supervisor;

pub use error::SupervisorError;
pub use prompt::{build_prompt, QUESTION_MARKER};
pub use reconcile::{reconcile, NO_OUTPUT_PLACEHOLDER, UNSUPERVISED_PLACEHOLDER};
pub use registry::HandleRegistry;
pub use scheduler::Scheduler;
pub use supervisor::{SchedulerStatus, Supervisor, SupervisorDeps};

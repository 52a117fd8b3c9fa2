// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: sessions, worker processes, change sinks

mod env;
pub mod notify;
pub mod session;
pub mod subprocess;
pub mod traced;
pub mod worker;

pub use notify::{BroadcastChangeSink, ChangeSink, NotifyError};
pub use session::{SessionAdapter, SessionError, TmuxAdapter};
pub use traced::TracedSession;
pub use worker::{
    session_name, Backend, Recovery, ScratchPaths, WorkerError, WorkerHandle, WorkerLauncher,
};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use notify::FakeChangeSink;
#[cfg(any(test, feature = "test-support"))]
pub use session::{FakeSession, FakeSessionAdapter, SessionCall};

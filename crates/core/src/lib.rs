// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fm-core: task model, lifecycle and output handling for Foreman

pub mod clock;
pub mod config;
pub mod event;
pub mod id;
pub mod sanitize;
pub mod task;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{Config, ConfigError, ConfigUpdate, WorkerCommand, MAX_POLL_INTERVAL_SECS};
pub use event::Event;
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use sanitize::{sanitize, truncate_tail, MAX_OUTPUT_CHARS};
pub use task::{
    check_transition, HistoryEntry, Role, Task, TaskId, TaskStatus, TransitionError, Trigger,
    WorkerRef,
};

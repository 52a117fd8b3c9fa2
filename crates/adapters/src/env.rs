// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment knobs read by the adapters.

use std::time::Duration;

const SESSION_POLL_VAR: &str = "FM_SESSION_POLL_MS";
const DEFAULT_SESSION_POLL: Duration = Duration::from_secs(3);

/// How often a session watcher asks tmux whether its session still exists.
pub fn session_poll_ms() -> Duration {
    std::env::var(SESSION_POLL_VAR)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|&ms| ms > 0)
        .map_or(DEFAULT_SESSION_POLL, Duration::from_millis)
}

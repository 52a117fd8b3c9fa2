// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment knobs read by the daemon.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

const STATE_DIR_VAR: &str = "FM_STATE_DIR";
const TIMER_CHECK_VAR: &str = "FM_TIMER_CHECK_MS";

/// `$FM_STATE_DIR`, else the platform state dir (XDG on Linux) plus
/// `foreman`, else `~/.local/state/foreman`.
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Some(dir) = std::env::var_os(STATE_DIR_VAR).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::state_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/state")))
        .map(|base| base.join("foreman"))
        .ok_or(LifecycleError::NoStateDir)
}

/// Positive millisecond override for the deadline check resolution.
pub fn timer_check_ms() -> Option<Duration> {
    let ms: u64 = std::env::var(TIMER_CHECK_VAR).ok()?.trim().parse().ok()?;
    (ms > 0).then(|| Duration::from_millis(ms))
}

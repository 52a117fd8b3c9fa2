// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tick scheduling

use std::time::{Duration, Instant};

/// Longest interval the scheduler arms for; larger values are clamped.
pub const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Periodic tick deadline, checked by the daemon loop.
///
/// The scheduler never sleeps itself: the owner asks [`Scheduler::poll`]
/// whether a tick is due.
#[derive(Debug)]
pub struct Scheduler {
    interval: Duration,
    next: Option<Instant>,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.min(MAX_INTERVAL),
            next: None,
        }
    }

    /// Arm the scheduler.
    ///
    /// Returns false if it was already running. The caller runs the
    /// immediate tick when this returns true.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.next.is_some() {
            return false;
        }
        self.next = Some(self.deadline_after(now));
        true
    }

    /// Disarm the scheduler; idempotent.
    pub fn stop(&mut self) {
        self.next = None;
    }

    pub fn is_running(&self) -> bool {
        self.next.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the interval. Takes effect on the next [`Scheduler::start`].
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval.min(MAX_INTERVAL);
    }

    /// Whether a tick is due at `now`; re-arms for `now + interval` if so.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next {
            Some(due) if due <= now => {
                self.next = Some(self.deadline_after(now));
                true
            }
            _ => false,
        }
    }

    fn deadline_after(&self, now: Instant) -> Instant {
        now.checked_add(self.interval).unwrap_or(now)
    }

    /// Get the next tick time
    pub fn next_deadline(&self) -> Option<Instant> {
        self.next
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;

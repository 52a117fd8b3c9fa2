//! Test helpers for behavioral specifications.
//!
//! Provides a small DSL for running fmd against a throwaway state directory.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

// Aggressive timeouts for fast tests.
//
// IMPORTANT:
//   Do NOT change these.
//   File a performance bug instead.
const FM_TIMER_CHECK_MS: &str = "20";
const FM_SESSION_POLL_MS: &str = "50";

// Spec polling timeouts
pub const SPEC_POLL_INTERVAL_MS: u64 = 10;
pub const SPEC_WAIT_MAX_MS: u64 = 5000;

/// Returns the path to a binary, checking llvm-cov target directory first.
/// Falls back to resolving relative to the test binary itself when
/// CARGO_MANIFEST_DIR is stale.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    // The test binary lives at target/debug/deps/specs-<hash>, so its
    // grandparent is target/debug/ where fmd is built.
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

/// Returns the path to the fmd daemon binary.
pub fn fmd_binary() -> PathBuf {
    binary_path("fmd")
}

// =============================================================================
// Polling
// =============================================================================

/// Poll a condition until it returns true or timeout is reached.
pub fn wait_for<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);
    let poll_interval = std::time::Duration::from_millis(SPEC_POLL_INTERVAL_MS);

    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(poll_interval);
    }
    false
}

// =============================================================================
// Workspace
// =============================================================================

/// Isolated state directory plus a work directory for workers.
///
/// Daemons started from here never see tmux (PATH is emptied), so workers
/// run as direct children and must be given by absolute path.
pub struct Workspace {
    state_dir: tempfile::TempDir,
    work_dir: tempfile::TempDir,
    daemons: Vec<Child>,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            state_dir: tempfile::tempdir().unwrap(),
            work_dir: tempfile::tempdir().unwrap(),
            daemons: Vec::new(),
        }
    }

    pub fn state_path(&self) -> &Path {
        self.state_dir.path()
    }

    pub fn work_path(&self) -> &Path {
        self.work_dir.path()
    }

    /// An fmd command bound to this workspace
    pub fn fmd(&self) -> Command {
        let mut cmd = Command::new(fmd_binary());
        cmd.env("FM_STATE_DIR", self.state_path())
            .env("FM_TIMER_CHECK_MS", FM_TIMER_CHECK_MS)
            .env("FM_SESSION_POLL_MS", FM_SESSION_POLL_MS)
            .env("PATH", "/nonexistent")
            .env_remove("XDG_STATE_HOME")
            .current_dir(self.work_path());
        cmd
    }

    /// Start a daemon and wait until it prints READY.
    pub fn start(&mut self) -> u32 {
        let mut child = self
            .fmd()
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("fmd should spawn");

        let stdout = child.stdout.take().unwrap();
        let mut line = String::new();
        BufReader::new(stdout).read_line(&mut line).unwrap();
        assert_eq!(line.trim(), "READY", "daemon log:\n{}", self.daemon_log());

        let pid = child.id();
        self.daemons.push(child);
        pid
    }

    /// Send SIGTERM to a daemon and wait for it to exit.
    pub fn stop(&mut self, pid: u32) -> std::process::ExitStatus {
        signal(pid, "-TERM");
        let pos = self
            .daemons
            .iter()
            .position(|c| c.id() == pid)
            .expect("daemon started by this workspace");
        self.daemons.remove(pos).wait().unwrap()
    }

    /// Write a file in the state directory before the daemon starts.
    pub fn state_file(&self, name: &str, value: &serde_json::Value) {
        std::fs::write(
            self.state_path().join(name),
            serde_json::to_string_pretty(value).unwrap(),
        )
        .unwrap();
    }

    /// Parsed `tasks.json`, or `None` if it is missing or mid-write.
    pub fn tasks(&self) -> Option<Vec<serde_json::Value>> {
        let text = std::fs::read_to_string(self.state_path().join("tasks.json")).ok()?;
        let file: serde_json::Value = serde_json::from_str(&text).ok()?;
        file.get("tasks")?.as_array().cloned()
    }

    /// Read the daemon log file contents (for debugging test failures)
    pub fn daemon_log(&self) -> String {
        let log_path = self.state_path().join("daemon.log");
        std::fs::read_to_string(log_path).unwrap_or_else(|_| "(no daemon log)".to_string())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        for mut child in self.daemons.drain(..) {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn signal(pid: u32, sig: &str) {
    Command::new("kill")
        .args([sig, &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("kill should run");
}

/// A `tasks.json` body holding `tasks`
pub fn tasks_file(tasks: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "version": 1,
        "saved_at": "2026-01-01T00:00:00Z",
        "tasks": tasks,
    })
}

/// A task record as the store writes it
pub fn task_record(id: &str, title: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": title,
        "description": "",
        "status": status,
        "created_at_ms": 1_000,
        "updated_at_ms": 1_000,
    })
}

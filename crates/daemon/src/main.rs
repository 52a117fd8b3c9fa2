// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Foreman Daemon (fmd)
//!
//! Background process that owns the task supervisor.
//!
//! A single loop serializes everything that mutates tasks: worker
//! completion events and scheduler ticks.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod env;
mod lifecycle;

use std::path::Path;
use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use crate::lifecycle::{LifecycleError, Paths, StartupResult};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// What the command line asks for
#[derive(Debug, PartialEq, Eq)]
enum Invocation {
    Run,
    Version,
    Help,
    Unexpected(String),
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Invocation {
    match args.next().as_deref() {
        None => Invocation::Run,
        Some("--version" | "-V" | "-v") => Invocation::Version,
        Some("--help" | "-h" | "help") => Invocation::Help,
        Some(other) => Invocation::Unexpected(other.to_string()),
    }
}

const HELP: &str = "\
Foreman Daemon - dispatches queued tasks to coding-agent workers

USAGE:
    fmd

Workers run in tmux sessions when tmux is available, otherwise
as child processes. State lives in $FM_STATE_DIR
(default ~/.local/state/foreman).

OPTIONS:
    -h, --help       Print help information
    -v, --version    Print version information";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Info flags never touch the state dir or the lock
    match parse_args(std::env::args().skip(1)) {
        Invocation::Run => {}
        Invocation::Version => {
            println!("fmd {VERSION}");
            return Ok(());
        }
        Invocation::Help => {
            println!("fmd {VERSION}");
            println!("{HELP}");
            return Ok(());
        }
        Invocation::Unexpected(arg) => {
            eprintln!("error: unexpected argument '{arg}'");
            eprintln!("Usage: fmd [--help | --version]");
            std::process::exit(1);
        }
    }

    let paths = Paths::load()?;

    // Rotate before the marker so the marker starts the fresh log
    rotate_log_if_needed(&paths.log_path);

    // Write startup marker to log (before tracing setup)
    write_startup_marker(&paths)?;

    let log_guard = setup_logging(&paths)?;

    info!("Starting daemon");

    let StartupResult {
        mut daemon,
        mut event_rx,
    } = match lifecycle::startup(&paths).await {
        Ok(r) => r,
        Err(LifecycleError::LockFailed(_)) => {
            report_already_running(&paths);
            std::process::exit(1);
        }
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&paths, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    daemon.supervisor.start_scheduler().await;

    // Signal ready for a parent process waiting on startup
    println!("READY");

    // NOTE: Must be created outside the loop - tokio::select! re-evaluates
    // branches on each iteration, so using sleep() inside would reset on
    // every event, causing ticks to never fire during activity.
    let mut timer_check = tokio::time::interval(timer_check_interval());

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else {
                    info!("Event channel closed, shutting down...");
                    break;
                };
                if let Err(e) = daemon.supervisor.handle_event(event).await {
                    error!("Error processing worker event: {}", e);
                }
            }

            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break;
            }

            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                break;
            }

            _ = timer_check.tick() => {
                daemon.supervisor.check_timers().await;
            }
        }
    }

    daemon.shutdown();
    info!("Daemon stopped");
    Ok(())
}

/// Tell the user which daemon holds the lock.
fn report_already_running(paths: &Paths) {
    eprintln!("fmd is already running");
    let pid = std::fs::read_to_string(&paths.lock_path).unwrap_or_default();
    if !pid.trim().is_empty() {
        eprintln!("  pid: {}", pid.trim());
    }
}

/// Default resolution of scheduler deadline checks
const DEFAULT_TIMER_CHECK: Duration = Duration::from_secs(1);

fn timer_check_interval() -> Duration {
    env::timer_check_ms().unwrap_or(DEFAULT_TIMER_CHECK)
}

/// Log size that triggers rotation at startup (10 MiB)
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Rotated logs kept: daemon.log.1 (newest) through daemon.log.3
const MAX_ROTATED_LOGS: u32 = 3;

/// Move an oversized log to `.1`, shifting older rotations up and dropping
/// the oldest. Best effort: failures leave the log where it is.
fn rotate_log_if_needed(log_path: &Path) {
    let Ok(meta) = std::fs::metadata(log_path) else {
        return;
    };
    if meta.len() <= MAX_LOG_SIZE {
        return;
    }

    let rotated = |n: u32| {
        let mut name = log_path.as_os_str().to_owned();
        name.push(format!(".{n}"));
        std::path::PathBuf::from(name)
    };

    let _ = std::fs::remove_file(rotated(MAX_ROTATED_LOGS));
    for n in (1..MAX_ROTATED_LOGS).rev() {
        let from = rotated(n);
        if from.exists() {
            let _ = std::fs::rename(&from, rotated(n + 1));
        }
    }
    let _ = std::fs::rename(log_path, rotated(1));
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- fmd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- fmd: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(paths: &Paths) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = paths.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
fn write_startup_error(paths: &Paths, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    paths: &Paths,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let file_appender = tracing_appender::rolling::never(
        paths.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        paths
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

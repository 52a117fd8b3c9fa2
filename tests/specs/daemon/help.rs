//! Daemon help and version specs
//!
//! Verify fmd --help, --version, and related flags work without
//! acquiring the daemon lock (no startup attempt).

use crate::prelude::*;

fn fmd(arg: &str) -> std::process::Output {
    assert_cmd::Command::new(fmd_binary())
        .arg(arg)
        .env("FM_STATE_DIR", "/nonexistent/fm-state")
        .output()
        .unwrap()
}

#[test]
fn fmd_version_flags_show_version() {
    for flag in ["--version", "-v", "-V"] {
        let output = fmd(flag);
        assert!(output.status.success(), "{flag}");
        similar_asserts::assert_eq!(
            String::from_utf8_lossy(&output.stdout),
            format!("fmd {}\n", env!("CARGO_PKG_VERSION"))
        );
    }
}

#[test]
fn fmd_help_flags_show_usage() {
    for flag in ["--help", "-h", "help"] {
        let output = fmd(flag);
        assert!(output.status.success(), "{flag}");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("USAGE:"), "expected USAGE section, got: {stdout}");
        assert!(stdout.contains("--help"), "expected --help in output");
        assert!(stdout.contains("--version"), "expected --version in output");
    }
}

#[test]
fn fmd_unknown_arg_fails() {
    let output = fmd("--bogus");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("unexpected argument '--bogus'"),
        "expected error message, got: {stderr}"
    );
}

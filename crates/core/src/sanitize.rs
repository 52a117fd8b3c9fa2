// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cleanup of captured worker output.
//!
//! Worker output arrives either from a pipe or from a tmux pane log, and the
//! latter is full of cursor movement, colour and title escapes. Everything
//! stored on a task goes through [`sanitize`] and [`truncate_tail`] first.

/// Maximum number of characters kept from a worker's output.
pub const MAX_OUTPUT_CHARS: usize = 10_000;

/// Strip ANSI/VT control sequences and carriage returns.
pub fn sanitize(raw: &str) -> String {
    if !raw.chars().any(is_stray_control) {
        return raw.to_string();
    }
    strip_ansi_escapes::strip_str(raw).replace('\r', "")
}

/// Keep the last `max_chars` characters of `text`.
///
/// The tail is what matters for review: the end of a worker's output holds
/// its summary and any question it asks.
pub fn truncate_tail(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }
    text.chars().skip(total - max_chars).collect()
}

/// Control characters other than newline and tab never appear in clean output.
fn is_stray_control(c: char) -> bool {
    c.is_control() && c != '\n' && c != '\t'
}

#[cfg(test)]
#[path = "sanitize_tests.rs"]
mod tests;

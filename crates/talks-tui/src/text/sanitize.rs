//! Cleaning of untrusted message text before it reaches the terminal.
//!
//! Model output may contain escape sequences that would move the cursor,
//! change colors or retitle the window. Everything except printable text,
//! newlines and tabs is dropped.

use std::sync::OnceLock;

use regex::Regex;

/// Tabs are expanded to this many spaces.
const TAB_WIDTH: usize = 4;

fn escape_sequences() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            // CSI, OSC (BEL or ST terminated), then any other two-byte escape
            Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]")
                .ok()
        })
        .as_ref()
}

/// Strip escape sequences and control characters from `text`.
pub fn sanitize(text: &str) -> String {
    let stripped = match escape_sequences() {
        Some(pattern) => pattern.replace_all(text, ""),
        None => std::borrow::Cow::Borrowed(text),
    };

    let mut clean = String::with_capacity(stripped.len());
    for ch in stripped.chars() {
        match ch {
            '\n' => clean.push('\n'),
            '\t' => clean.push_str(&" ".repeat(TAB_WIDTH)),
            c if c.is_control() => {}
            c => clean.push(c),
        }
    }
    clean
}

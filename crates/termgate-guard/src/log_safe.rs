//! Making peer input safe to put in a log line.

use std::fmt::Write;

/// Escapes every control character in `s`.
///
/// Newlines become `\n` so a peer cannot forge extra log entries, and
/// escape sequences are written out as hex so they cannot repaint an
/// operator's terminal.
#[must_use]
pub fn sanitize_for_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{{{:x}}}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Cuts `s` to at most `max_chars` characters, appending `...` if it was
/// longer.
#[must_use]
pub fn truncate_for_log(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

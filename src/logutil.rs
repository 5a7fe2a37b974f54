//! Log hygiene for player-supplied text (words, display names, raw chat lines).

use std::fmt::Write;

/// Longest preview of user text kept in a log line.
const MAX_PREVIEW_CHARS: usize = 120;

/// Render `s` on one line: backslash, newline, carriage return and tab become their escape
/// sequences, other control characters become `\xNN`. Input longer than the preview
/// limit is cut and marked with an ellipsis.
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW_CHARS) + 4);
    let mut chars = s.chars();
    for ch in chars.by_ref().take(MAX_PREVIEW_CHARS) {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    if chars.next().is_some() {
        out.push('…');
    }
    out
}

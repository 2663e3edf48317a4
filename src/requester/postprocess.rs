//! Post-processing: deterministic cleanup of service output.
//!
//! Models are told to answer with the raw document, yet they still wrap it
//! in ```` ```json ```` fences, emit CRLF line endings, or sprinkle
//! zero-width characters. These rules undo that without touching content.
//!
//! Rules (applied in order):
//! 1. Strip one outer code fence, with or without a language tag
//! 2. Normalise line endings (CRLF → LF)
//! 3. Strip invisible Unicode (zero-width spaces, BOM, word joiner)
//! 4. Line-oriented formats end with exactly one newline; others are trimmed

use crate::format::OutputFormat;
use once_cell::sync::Lazy;
use regex::Regex;

/// Apply every cleanup rule for `format` to raw service output.
pub fn clean_output(input: &str, format: OutputFormat) -> String {
    let s = strip_outer_fence(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    if format.is_line_oriented() {
        ensure_final_newline(&s)
    } else {
        s.trim().to_string()
    }
}

// ── Rule 1: Strip outer fence ───────────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z0-9_+-]*[ \t]*\r?\n(.*?)\r?\n```\s*$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Normalise line endings ──────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Remove invisible characters ─────────────────────────────────────

const INVISIBLE: [char; 5] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

fn remove_invisible_chars(input: &str) -> String {
    input.chars().filter(|c| !INVISIBLE.contains(c)).collect()
}

// ── Rule 4: Final newline ───────────────────────────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}\n", trimmed)
    }
}

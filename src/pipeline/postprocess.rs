//! Post-processing: deterministic cleanup of collaborator-produced text.
//!
//! LLM-backed OCR and translation occasionally wrap their answer in code
//! fences or prefix it with a chatty preamble even when told not to. The rules
//! here remove those artefacts without touching the content itself. Text from
//! the HTTP backend goes through the same pass so both routes yield identical
//! shapes.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so the fence regex only has to match
//! `\n`. The preamble rule runs after trailing whitespace is trimmed and
//! strips leading blank space itself, so it sees the real first line.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply every cleanup rule, in order.
///
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip outer code fences
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive blank lines down to 1
/// 5. Drop a leading "Here is the translation:" style preamble
/// 6. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 7. Trim leading and trailing blank space
pub fn clean_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_outer_fences(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = strip_preamble(&s);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\n(.*)\n```\s*$").unwrap());

fn strip_outer_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 5: Drop a chatty preamble ───────────────────────────────────────────
//
// Only a first line that is nothing but the preamble is removed. A line like
// "Translation of the certificate follows" that carries content is kept.

static RE_PREAMBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:sure[,!.]?\s*)?(?:here\s+is|here's)\s+the\s+(?:translation|translated text|transcription|extracted text)(?:\s+(?:in|into)\s+\w+)?\s*:\s*\n").unwrap()
});

fn strip_preamble(input: &str) -> String {
    RE_PREAMBLE.replace(input.trim_start(), "").to_string()
}

// ── Rule 6: Remove invisible Unicode characters ──────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

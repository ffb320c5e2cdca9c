//! Post-processing: deterministic cleanup of extracted text.
//!
//! Text pulled out of PDF content streams and WordprocessingML runs carries
//! artefacts that are meaningless in the target format: Windows line endings,
//! zero-width characters, stray control bytes from odd font encodings, runs
//! of spaces produced by positioned glyphs. The rules below remove them
//! without touching the words themselves.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so every later rule only has to deal
//! with `\n`; control characters go before whitespace collapsing so a removed
//! byte cannot leave two spaces behind.

use crate::config::PageSeparator;
use once_cell::sync::Lazy;
use regex::Regex;

/// Clean one paragraph of DOCX text.
///
/// Intentional tabs and line breaks are kept; only noise is removed.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, …)
/// 3. Remove C0/C1 control characters other than tab and newline
/// 4. Trim trailing whitespace per line
pub fn clean_paragraph(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = remove_control_chars(&s);
    trim_trailing_whitespace(&s)
}

/// Split the raw text of one PDF page into cleaned text blocks.
///
/// A block is one extracted line. Blank lines separate nothing in PDF text
/// and are dropped.
pub fn split_blocks(page_text: &str) -> Vec<String> {
    let s = normalise_line_endings(page_text);
    let s = remove_invisible_chars(&s);
    s.lines()
        .map(|line| collapse_spaces(&remove_control_chars(line)).trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Join the blocks of every page into one plain-text document.
///
/// Blocks are separated by `\n`, pages by `separator`. Pages without text
/// contribute nothing, so no run of separators appears for blank pages.
/// No trailing newline is added.
pub fn assemble_text(pages: &[Vec<String>], separator: &PageSeparator) -> String {
    let sep = separator.render();
    pages
        .iter()
        .filter(|blocks| !blocks.is_empty())
        .map(|blocks| blocks.join("\n"))
        .collect::<Vec<_>>()
        .join(&sep)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Remove control characters ───────────────────────────────────────

static RE_CONTROL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F\u{80}-\u{9F}]").unwrap());

fn remove_control_chars(input: &str) -> String {
    RE_CONTROL.replace_all(input, "").to_string()
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .split('\n')
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse runs of spaces (PDF only) ───────────────────────────────
//
// Positioned glyph runs often come out with several spaces (or tabs) where
// the page shows a single word gap.

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());

fn collapse_spaces(input: &str) -> String {
    RE_SPACES.replace_all(input, " ").to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────

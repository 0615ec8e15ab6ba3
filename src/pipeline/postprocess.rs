//! Deterministic cleanup of OCR output.
//!
//! tesseract ends every page with a form feed, emits CRLF on Windows, and
//! pads layout whitespace liberally. None of that helps the language model,
//! and it inflates prompt tokens on multi-sheet plans.

use once_cell::sync::Lazy;
use regex::Regex;

static TRAILING_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+\n").expect("valid regex"));
static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Normalise one page of recognised text.
///
/// 1. Drop form feeds and NUL bytes
/// 2. CRLF / CR → LF
/// 3. Strip trailing spaces and tabs on every line
/// 4. Collapse three or more newlines into one blank line
/// 5. Trim leading/trailing whitespace of the page
pub fn clean_ocr_text(raw: &str) -> String {
    let text: String = raw.chars().filter(|c| *c != '\u{000C}' && *c != '\0').collect();
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = TRAILING_WS.replace_all(&text, "\n");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Join cleaned pages in page order, one blank line between pages.
/// Pages with no text are skipped.
pub fn join_pages<'a>(pages: impl IntoIterator<Item = &'a str>) -> String {
    pages
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

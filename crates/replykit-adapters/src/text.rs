//! Message text cleanup.
//!
//! Raw row text comes with timestamps, delivery ticks and whitespace noise
//! baked in by the host page. Extraction prefers the platforms' clean text
//! spans, but when it has to fall back to raw row text these helpers strip
//! the usual suspects.

use once_cell::sync::Lazy;
use regex::Regex;

/// Generic "clean text" wrappers tried after the platform's own text
/// selector and before raw row text.
pub const GENERIC_TEXT_SELECTORS: [&str; 3] =
    ["span.selectable-text", ".copyable-text", "[data-pre-plain-text]"];

/// Clock readings at the end of a line: "10:42", "10:42 PM", "22.41".
static TRAILING_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*\d{1,2}[:.]\d{2}(\s?[ap]\.?m\.?)?\s*$").unwrap());

/// Bracketed metadata prefixes like "[10:42, 3/4/2026] Ana:".
static BRACKETED_META: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[[^\]]{1,40}\]\s*").unwrap());

/// Normalize raw message text: drop metadata, collapse whitespace.
pub fn normalize(raw: &str) -> String {
    let mut text = raw.replace(['\u{00a0}', '\u{200b}', '\u{200e}', '\u{200f}'], " ");
    text = BRACKETED_META.replace(&text, "").into_owned();

    // Lines are stripped of trailing clocks separately; a multi-line
    // message keeps its inner lines intact.
    let cleaned: Vec<String> = text
        .lines()
        .map(|line| TRAILING_TIME.replace(line, "").into_owned())
        .collect();

    cleaned
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// First non-empty normalized candidate, if any.
pub fn first_non_empty<'a>(candidates: impl IntoIterator<Item = &'a str>) -> Option<String> {
    candidates
        .into_iter()
        .map(normalize)
        .find(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain() {
        assert_eq!(normalize("Hello there"), "Hello there");
    }

    #[test]
    fn test_normalize_strips_trailing_clock() {
        assert_eq!(normalize("Hello there 10:42"), "Hello there");
        assert_eq!(normalize("Hello there 10:42 PM"), "Hello there");
        assert_eq!(normalize("Hello there 9:05 a.m."), "Hello there");
    }

    #[test]
    fn test_normalize_keeps_inner_clock() {
        assert_eq!(normalize("meet at 10:42 tomorrow"), "meet at 10:42 tomorrow");
    }

    #[test]
    fn test_normalize_strips_bracketed_prefix() {
        assert_eq!(normalize("[10:42, 3/4/2026] Hello"), "Hello");
    }

    #[test]
    fn test_normalize_collapses_whitespace_and_nbsp() {
        assert_eq!(normalize("Hello\u{00a0}\u{00a0} there\n\n  friend"), "Hello there friend");
    }

    #[test]
    fn test_normalize_multiline_clock_per_line() {
        assert_eq!(normalize("Hello 10:42\nthere 11:00"), "Hello there");
    }

    #[test]
    fn test_normalize_empty_and_noise_only() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  10:42  "), "");
    }

    #[test]
    fn test_first_non_empty() {
        assert_eq!(
            first_non_empty(["", "  ", "Hi 10:42", "later"]),
            Some("Hi".to_string())
        );
        assert_eq!(first_non_empty(["", "10:42"]), None);
    }
}

//! Utility functions for text cleanup, log truncation and artifact naming.
//!
//! This module provides helper functions used throughout the crate:
//! - Headline cleanup shared by every extraction strategy
//! - String truncation for logging response previews
//! - Run stamps used by the JSON sink to name output files

use chrono::{DateTime, Utc};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag regex is valid"));

/// Clean a raw headline.
///
/// Removes markup (search engines wrap matched terms in `<em>`/`<b>`),
/// resolves XML entities, and collapses runs of whitespace into single spaces.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(clean_title("  <em>Rust</em> &amp;\n Go "), "Rust & Go");
/// ```
pub fn clean_title(raw: &str) -> String {
    let stripped = TAG_RE.replace_all(raw, "");
    let unescaped = quick_xml::escape::unescape(&stripped).unwrap_or(Cow::Borrowed(stripped.as_ref()));
    unescaped.split_whitespace().join(" ")
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut at a character boundary no later than `max` bytes
/// and get an ellipsis plus the number of omitted bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Build the stamp used to name one run's output file.
///
/// CI runners export `GITHUB_RUN_ID`/`GITHUB_RUN_NUMBER`; local runs fall
/// back to `local`/`0`. Concurrent runs therefore never overwrite each other.
pub fn run_stamp(run_id: Option<&str>, run_number: Option<&str>, at: DateTime<Utc>) -> String {
    format!(
        "{}_{}_{}",
        run_id.filter(|s| !s.is_empty()).unwrap_or("local"),
        run_number.filter(|s| !s.is_empty()).unwrap_or("0"),
        at.format("%Y%m%d_%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_clean_title_strips_markup() {
        assert_eq!(clean_title("  <em>Rust</em> 1.80 released "), "Rust 1.80 released");
        assert_eq!(clean_title("AT&amp;T earnings"), "AT&T earnings");
        assert_eq!(clean_title("line\n\t break"), "line break");
        assert_eq!(clean_title("<b></b>   "), "");
    }

    #[test]
    fn test_clean_title_tolerates_unknown_entities() {
        assert_eq!(clean_title("a&nbsp;b"), "a&nbsp;b");
    }

    #[test]
    fn test_clean_title_keeps_cjk() {
        assert_eq!(clean_title("<em>人工智能</em>新进展"), "人工智能新进展");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte_boundary() {
        let s = "人工智能人工智能";
        let result = truncate_for_log(s, 4);
        assert!(result.starts_with("人"));
        assert!(result.contains("(+21 bytes)"));
    }

    #[test]
    fn test_run_stamp() {
        let at = Utc.with_ymd_and_hms(2025, 5, 6, 14, 30, 5).unwrap();
        assert_eq!(run_stamp(None, None, at), "local_0_20250506_143005");
        assert_eq!(
            run_stamp(Some("991"), Some("17"), at),
            "991_17_20250506_143005"
        );
        assert_eq!(run_stamp(Some(""), None, at), "local_0_20250506_143005");
    }
}

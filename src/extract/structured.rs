//! Structured-data strategies: JSON-LD blocks, JSON bodies and JSON embedded in scripts.
//!
//! All three walk a `serde_json::Value` tree looking for objects that carry
//! both a headline-like key and a URL-like key.

use super::Candidate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

const TITLE_KEYS: &[&str] = &["title", "headline", "name"];
const URL_KEYS: &[&str] = &[
    "url",
    "article_url",
    "share_url",
    "display_url",
    "source_url",
    "link",
];

/// Schema.org container types that carry a name and url of their own but
/// are not results.
const CONTAINER_TYPES: &[&str] = &[
    "ItemList",
    "SearchResultsPage",
    "WebSite",
    "WebPage",
    "BreadcrumbList",
    "Organization",
];

const MAX_DEPTH: usize = 12;

/// Flat JSON objects mentioning a `"title"` key, as found in inline page state.
static SCRIPT_OBJECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\{[^{}]*"title"[^{}]*\}"#).expect("script object regex is valid"));

/// Items from `<script type="application/ld+json">` blocks.
pub fn json_ld(body: &str, _base: &Url) -> Vec<Candidate> {
    let document = Html::parse_document(body);
    let Ok(selector) = Selector::parse(r#"script[type="application/ld+json"]"#) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for script in document.select(&selector) {
        let raw: String = script.text().collect();
        if let Ok(value) = serde_json::from_str::<Value>(raw.trim()) {
            collect_items(&value, &mut out, 0);
        }
    }
    out
}

/// Items from a body that is itself JSON, e.g. an API response with a `data` array.
pub fn json_body(body: &str, _base: &Url) -> Vec<Candidate> {
    let trimmed = body.trim_start_matches('\u{feff}').trim();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return Vec::new();
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => {
            let mut out = Vec::new();
            collect_items(&value, &mut out, 0);
            out
        }
        Err(_) => Vec::new(),
    }
}

/// Items from flat JSON objects embedded in inline `<script>` elements.
///
/// Page state is often assigned to a global (`window.__DATA__ = {...}`) and
/// is not valid JSON as a whole, so each innermost object mentioning
/// `"title"` is parsed on its own.
pub fn script_objects(body: &str, _base: &Url) -> Vec<Candidate> {
    let document = Html::parse_document(body);
    let Ok(selector) = Selector::parse("script:not([src])") else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for script in document.select(&selector) {
        let raw: String = script.text().collect();
        if !raw.contains("\"title\"") {
            continue;
        }
        for m in SCRIPT_OBJECT_RE.find_iter(&raw) {
            if let Ok(value) = serde_json::from_str::<Value>(m.as_str()) {
                if let Some(candidate) = candidate_from(&value) {
                    out.push(candidate);
                }
            }
        }
    }
    out
}

/// Depth-first, document-order walk collecting title/url objects.
pub fn collect_items(value: &Value, out: &mut Vec<Candidate>, depth: usize) {
    if depth > MAX_DEPTH {
        return;
    }
    match value {
        Value::Array(items) => {
            for item in items {
                collect_items(item, out, depth + 1);
            }
        }
        Value::Object(map) => {
            if !is_container(value) {
                if let Some(candidate) = candidate_from(value) {
                    out.push(candidate);
                    return;
                }
            }
            for child in map.values() {
                collect_items(child, out, depth + 1);
            }
        }
        // Some APIs double-encode nested records as JSON strings.
        Value::String(s) if s.starts_with('{') && s.contains("\"title\"") => {
            if let Ok(inner) = serde_json::from_str::<Value>(s) {
                collect_items(&inner, out, depth + 1);
            }
        }
        _ => {}
    }
}

fn candidate_from(value: &Value) -> Option<Candidate> {
    let title = first_string(value, TITLE_KEYS)?;
    let href = first_string(value, URL_KEYS)?;
    Some(Candidate::new(title, href))
}

fn first_string<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| value.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

fn is_container(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => CONTAINER_TYPES.contains(&t.as_str()),
        Some(Value::Array(ts)) => ts
            .iter()
            .filter_map(Value::as_str)
            .any(|t| CONTAINER_TYPES.contains(&t)),
        _ => false,
    }
}

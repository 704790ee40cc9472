//! Google News search (`tbm=nws`).
//!
//! Server-rendered results sit in `div.g` / `div.SoaBEf` blocks with an `h3`
//! or `div[role="heading"]` headline. Links are frequently wrapped as
//! `/url?q=<target>&sa=…`. Google exposes no unauthenticated search API, so the
//! chain has no fallback.

use super::{DomPattern, RedirectRule, Strategy, StrategyChain};
use crate::extract::structured;

pub const SEARCH_TEMPLATE: &str = "https://www.google.com/search?q={keyword}&tbm=nws";

static PATTERNS: &[DomPattern] = &[
    DomPattern {
        container: "div.g",
        title: &["h3"],
        link: Some("a[href]"),
        title_attr: None,
        url_attr: None,
        min_title_chars: 1,
    },
    DomPattern {
        container: "div.SoaBEf, div[data-news-doc-id]",
        title: &["div[role=\"heading\"]", "h3"],
        link: Some("a[href]"),
        title_attr: None,
        url_attr: None,
        min_title_chars: 1,
    },
    DomPattern {
        container: "a[href^=\"/url?\"], a[href^=\"http\"]",
        title: &[],
        link: None,
        title_attr: None,
        url_attr: None,
        min_title_chars: 11,
    },
];

pub static CHAIN: StrategyChain = StrategyChain {
    page: &[Strategy::Structured(structured::json_ld), Strategy::Dom(PATTERNS)],
    fallback_api: None,
    redirects: &[RedirectRule {
        path_suffix: "/url",
        params: &["q", "url"],
    }],
};

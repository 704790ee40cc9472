//! Bing News search.
//!
//! The search page renders result cards as `div.news-card` carrying the
//! headline and target in `data-title`/`data-url`. Older layouts only have
//! `a.title` anchors inside generic news/card/item blocks. The RSS variant of
//! the same search (`format=rss`) is the fallback; its links go through
//! `apiclick.aspx` and are unwrapped to the publisher URL.

use super::{ApiStrategy, DomPattern, RedirectRule, Strategy, StrategyChain};
use crate::extract::{feed, structured};

pub const SEARCH_TEMPLATE: &str = "https://www.bing.com/news/search?q={keyword}";

const API_TEMPLATE: &str = "https://www.bing.com/news/search?q={keyword}&format=rss";

const HEADINGS: &[&str] = &[
    "h2[class*=\"title\"]",
    "h3[class*=\"title\"]",
    "h4[class*=\"title\"]",
    "a[class*=\"title\"]",
    "h2",
    "h3",
    "h4",
];

static PATTERNS: &[DomPattern] = &[
    DomPattern {
        container: "div.news-card",
        title: &["a.title"],
        link: Some("a.title"),
        title_attr: Some("data-title"),
        url_attr: Some("data-url"),
        min_title_chars: 6,
    },
    DomPattern {
        container: "div[class*=\"news\"], div[class*=\"card\"], div[class*=\"item\"], article",
        title: HEADINGS,
        link: Some("a[href]"),
        title_attr: None,
        url_attr: None,
        min_title_chars: 6,
    },
    DomPattern {
        container: "a[href]",
        title: &[],
        link: None,
        title_attr: None,
        url_attr: None,
        min_title_chars: 11,
    },
];

pub static CHAIN: StrategyChain = StrategyChain {
    page: &[Strategy::Structured(structured::json_ld), Strategy::Dom(PATTERNS)],
    fallback_api: Some(ApiStrategy {
        template: API_TEMPLATE,
        parse: feed::rss_items,
    }),
    redirects: &[RedirectRule {
        path_suffix: "apiclick.aspx",
        params: &["url"],
    }],
};

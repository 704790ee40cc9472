//! Toutiao (今日头条) news search.
//!
//! The search page is mostly client-rendered: result data sits in inline
//! script state, while the server-rendered cards carry a
//! `data-druid-card-data-id` attribute. Result links usually go through
//! `/search/jump?url=<target>`. The legacy `api/search/content` JSON endpoint
//! is tried last; it is frequently refused without a signed request, in which
//! case Toutiao simply contributes nothing.

use super::{ApiStrategy, DomPattern, RedirectRule, Strategy, StrategyChain};
use crate::extract::structured;

pub const SEARCH_TEMPLATE: &str =
    "https://so.toutiao.com/search?dvpf=pc&source=input&keyword={keyword}&pd=information";

const API_TEMPLATE: &str = "https://www.toutiao.com/api/search/content/?aid=24&app_name=web_search&offset=0&format=json&keyword={keyword}&autoload=true&count=20&cur_tab=1&from=search_tab";

static PATTERNS: &[DomPattern] = &[
    DomPattern {
        container: "div[data-druid-card-data-id]",
        title: &["a.text-ellipsis", ".cs-header a", "a[href]"],
        link: Some("a[href]"),
        title_attr: None,
        url_attr: None,
        min_title_chars: 6,
    },
    DomPattern {
        container: "div.result-content",
        title: &["a[class*=\"title\"]", "h3", "a[href]"],
        link: Some("a[href]"),
        title_attr: None,
        url_attr: None,
        min_title_chars: 6,
    },
    DomPattern {
        container: "a[href*=\"/article/\"], a[href*=\"/group/\"], a[href*=\"toutiao.com/a\"], a[href*=\"/search/jump\"]",
        title: &[],
        link: None,
        title_attr: None,
        url_attr: None,
        min_title_chars: 6,
    },
];

pub static CHAIN: StrategyChain = StrategyChain {
    page: &[
        Strategy::Structured(structured::json_ld),
        Strategy::Structured(structured::script_objects),
        Strategy::Dom(PATTERNS),
    ],
    fallback_api: Some(ApiStrategy {
        template: API_TEMPLATE,
        parse: structured::json_body,
    }),
    redirects: &[RedirectRule {
        path_suffix: "/search/jump",
        params: &["url"],
    }],
};

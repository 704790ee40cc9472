//! Strategy-chain extraction of search hits from raw platform responses.
//!
//! Extraction never fails: malformed input simply produces no items. A chain
//! is walked in priority order and the first strategy that yields at least one
//! valid item wins:
//!
//! 1. [`structured`]: JSON-LD, JSON bodies, JSON embedded in scripts
//! 2. [`dom`]: ordered CSS selector patterns
//! 3. the platform's fallback API, parsed by [`structured`] or [`feed`]
//!
//! Every strategy only proposes [`Candidate`]s. [`finalize`] turns them into
//! [`ResultItem`]s: titles are cleaned, URLs resolved and unwrapped, invalid
//! pairs dropped, duplicates removed and the list capped.

pub mod dom;
pub mod feed;
pub mod structured;

use crate::models::{PlatformId, ResultItem, StrategyKind};
use crate::platforms::{RedirectRule, Strategy, StrategyChain};
use crate::utils::clean_title;
use std::collections::HashSet;
use tracing::{debug, instrument};
use url::Url;

/// A raw (title, href) pair before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub title: String,
    pub href: String,
}

impl Candidate {
    pub fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: href.into(),
        }
    }
}

/// What a chain produced for one response.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub items: Vec<ResultItem>,
    pub strategy: Option<StrategyKind>,
}

/// Run the page strategies of `chain` over a search page body.
///
/// `base` is the URL the body was served from; relative links resolve
/// against it.
#[instrument(level = "debug", skip_all, fields(%platform, bytes = body.len()))]
pub fn extract_page(
    platform: PlatformId,
    chain: &StrategyChain,
    body: &str,
    base: &Url,
    max: usize,
) -> Extraction {
    for strategy in chain.page {
        let (kind, items) = match strategy {
            Strategy::Structured(parse) => {
                let candidates = parse(body, base);
                (
                    StrategyKind::Structured,
                    finalize(platform, chain.redirects, candidates, base, max),
                )
            }
            Strategy::Dom(patterns) => (
                StrategyKind::Dom,
                dom::extract(platform, patterns, chain.redirects, body, base, max),
            ),
        };

        if !items.is_empty() {
            debug!(strategy = %kind, count = items.len(), "Strategy accepted");
            return Extraction {
                items,
                strategy: Some(kind),
            };
        }
        debug!(strategy = %kind, "Strategy produced nothing");
    }
    Extraction::default()
}

/// Parse a fallback API response with the chain's API parser.
pub fn extract_api(
    platform: PlatformId,
    chain: &StrategyChain,
    body: &str,
    base: &Url,
    max: usize,
) -> Extraction {
    let Some(api) = &chain.fallback_api else {
        return Extraction::default();
    };
    let items = finalize(platform, chain.redirects, (api.parse)(body, base), base, max);
    let strategy = (!items.is_empty()).then_some(StrategyKind::FallbackApi);
    Extraction { items, strategy }
}

/// Normalize, validate, deduplicate and cap candidates, preserving order.
pub fn finalize(
    platform: PlatformId,
    redirects: &[RedirectRule],
    candidates: Vec<Candidate>,
    base: &Url,
    max: usize,
) -> Vec<ResultItem> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter_map(|c| {
            let title = clean_title(&c.title);
            if title.is_empty() {
                return None;
            }
            let url = normalize_url(&c.href, base, redirects)?;
            Some(ResultItem {
                title,
                url,
                platform,
            })
        })
        .filter(|item| seen.insert(item.url.clone()))
        .take(max)
        .collect()
}

/// Resolve `href` against `base` into an absolute http(s) URL without fragment.
///
/// Known redirect wrappers on the base host are unwrapped to their target. Returns `None` for
/// empty, script or non-web links.
pub fn normalize_url(href: &str, base: &Url, redirects: &[RedirectRule]) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.to_ascii_lowercase().starts_with("javascript:") {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if let Some(target) = unwrap_redirect(&url, base, redirects) {
        url = target;
    }
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}

/// Redirect wrappers only live on the platform's own host; a publisher path
/// that happens to end in `/url` is left alone.
fn unwrap_redirect(url: &Url, base: &Url, redirects: &[RedirectRule]) -> Option<Url> {
    if url.host_str() != base.host_str() {
        return None;
    }
    let rule = redirects
        .iter()
        .find(|r| url.path().to_ascii_lowercase().ends_with(r.path_suffix))?;
    rule.params.iter().find_map(|param| {
        url.query_pairs()
            .find(|(k, _)| k.eq_ignore_ascii_case(param))
            .and_then(|(_, v)| Url::parse(&v).ok())
            .filter(|target| matches!(target.scheme(), "http" | "https"))
    })
}

//! DOM-selector strategy: ordered CSS patterns over the search page markup.
//!
//! Patterns are tried in order and the first one that yields at least one
//! valid item wins, which keeps extraction working while a platform's markup
//! drifts between several known layouts.

use super::{Candidate, finalize};
use crate::models::{PlatformId, ResultItem};
use crate::platforms::{DomPattern, RedirectRule};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

/// Apply `patterns` to `body`, returning the items of the first productive pattern.
pub fn extract(
    platform: PlatformId,
    patterns: &[DomPattern],
    redirects: &[RedirectRule],
    body: &str,
    base: &Url,
    max: usize,
) -> Vec<ResultItem> {
    let document = Html::parse_document(body);
    for pattern in patterns {
        let candidates = candidates(&document, pattern);
        let items = finalize(platform, redirects, candidates, base, max);
        if !items.is_empty() {
            debug!(container = pattern.container, count = items.len(), "Selector pattern matched");
            return items;
        }
    }
    Vec::new()
}

/// Raw candidates for a single pattern, in document order.
pub fn candidates(document: &Html, pattern: &DomPattern) -> Vec<Candidate> {
    let Some(container) = parse_selector(pattern.container) else {
        return Vec::new();
    };
    let title_selectors: Vec<Selector> = pattern.title.iter().filter_map(|s| parse_selector(s)).collect();
    let link_selector = match pattern.link {
        Some(s) => match parse_selector(s) {
            Some(sel) => Some(sel),
            None => return Vec::new(),
        },
        None => None,
    };

    let mut out = Vec::new();
    for block in document.select(&container) {
        let title_el = title_selectors
            .iter()
            .find_map(|sel| block.select(sel).find(|el| !text_of(el).is_empty()));
        let link_el = nearest_link(block, title_el, link_selector.as_ref());

        let title = pattern
            .title_attr
            .and_then(|a| block.value().attr(a))
            .map(str::to_string)
            .filter(|t| !t.trim().is_empty())
            .or_else(|| title_el.map(|el| text_of(&el)))
            .or_else(|| link_el.map(|el| text_of(&el)))
            .unwrap_or_default();

        let href = pattern
            .url_attr
            .and_then(|a| block.value().attr(a))
            .or_else(|| link_el.and_then(|el| el.value().attr("href")))
            .unwrap_or_default();

        if title.chars().count() < pattern.min_title_chars || href.trim().is_empty() {
            continue;
        }
        out.push(Candidate::new(title, href));
    }
    out
}

/// The anchor closest to the headline: the headline itself or its enclosing
/// anchor, then the pattern's link selector, then the block when it is an anchor.
fn nearest_link<'a>(
    block: ElementRef<'a>,
    title_el: Option<ElementRef<'a>>,
    link_selector: Option<&Selector>,
) -> Option<ElementRef<'a>> {
    let from_title = title_el.and_then(|el| {
        std::iter::once(el)
            .chain(el.ancestors().filter_map(ElementRef::wrap))
            .take_while(|a| *a != block)
            .chain(std::iter::once(block))
            .find(|a| is_link(a))
            .or_else(|| el.select(&ANCHOR).next())
    });
    from_title
        .or_else(|| link_selector.and_then(|sel| block.select(sel).find(is_link)))
        .or_else(|| is_link(&block).then_some(block))
}

static ANCHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("anchor selector is valid"));

fn is_link(el: &ElementRef<'_>) -> bool {
    el.value().name() == "a" && el.value().attr("href").is_some()
}

fn text_of(el: &ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ").trim().to_string()
}

fn parse_selector(raw: &str) -> Option<Selector> {
    match Selector::parse(raw) {
        Ok(sel) => Some(sel),
        Err(e) => {
            warn!(selector = raw, error = ?e, "Invalid selector pattern skipped");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.example.com/news/search?q=x").unwrap()
    }

    static CARDS: &[DomPattern] = &[
        DomPattern {
            container: "div.card",
            title: &["h3", "a.title"],
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

    static ATTRS: &[DomPattern] = &[DomPattern {
        container: "div.news-card",
        title: &["a.title"],
        link: Some("a.title"),
        title_attr: Some("data-title"),
        url_attr: Some("data-url"),
        min_title_chars: 1,
    }];

    #[test]
    fn test_first_pattern_wins() {
        let html = r#"
            <div class="card"><a href="/s/1"><h3>Headline number one</h3></a></div>
            <div class="card"><h3>Headline number two</h3><a href="https://other.example/2">more</a></div>
            <a href="/nav/about">About this long site link</a>"#;
        let items = extract(PlatformId::Bing, CARDS, &[], html, &base(), 10);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Headline number one");
        assert_eq!(items[0].url, "https://www.example.com/s/1");
        assert_eq!(items[1].url, "https://other.example/2");
    }

    #[test]
    fn test_falls_back_to_bare_anchors_with_min_length() {
        let html = r#"
            <div class="wrapper">
              <a href="/login">Sign in</a>
              <a href="https://news.example/a">A sufficiently long headline</a>
            </div>"#;
        let items = extract(PlatformId::Bing, CARDS, &[], html, &base(), 10);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "A sufficiently long headline");
    }

    #[test]
    fn test_short_titles_filtered() {
        let html = r#"<div class="card"><h3>Short</h3><a href="/s/1">x</a></div>"#;
        let doc = Html::parse_document(html);
        assert!(candidates(&doc, &CARDS[0]).is_empty());
    }

    #[test]
    fn test_attribute_sources_preferred() {
        let html = r#"
            <div class="news-card" data-title="Attribute headline" data-url="https://pub.example/x">
              <a class="title" href="/redirect">Anchor text</a>
            </div>
            <div class="news-card"><a class="title" href="https://pub.example/y">Anchor only</a></div>"#;
        let items = extract(PlatformId::Bing, ATTRS, &[], html, &base(), 10);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Attribute headline");
        assert_eq!(items[0].url, "https://pub.example/x");
        assert_eq!(items[1].title, "Anchor only");
    }

    #[test]
    fn test_no_match_is_empty() {
        let items = extract(PlatformId::Google, CARDS, &[], "<html><body>Captcha</body></html>", &base(), 10);
        assert!(items.is_empty());
    }
}

//! Platform registry: endpoints and extraction strategy chains per news platform.
//!
//! Each platform is a fixed value: a search endpoint template, an optional
//! fallback API template, and a static [`StrategyChain`] describing how to pull
//! (title, url) pairs out of whatever that platform returns.
//!
//! # Supported Platforms
//!
//! | Platform | Module | Search surface | Fallback API |
//! |----------|--------|----------------|--------------|
//! | Toutiao | [`toutiao`] | `so.toutiao.com` search page | `/api/search/content/` JSON |
//! | Google | [`google`] | `google.com/search?tbm=nws` | none |
//! | Bing | [`bing`] | `bing.com/news/search` | `format=rss` feed |
//!
//! Adding a platform means adding a [`PlatformId`] variant and a module that
//! exports its `CHAIN` and templates; the aggregator is untouched.

pub mod bing;
pub mod google;
pub mod toutiao;

use crate::config::{KEYWORD_PLACEHOLDER, Settings};
use crate::error::{FetchError, FetchErrorKind, ValidationError};
use crate::extract::Candidate;
use crate::models::{PlatformId, SearchRequest};
use tracing::debug;
use url::Url;

/// A pure parser from a response body (and the URL it came from) to raw candidates.
pub type ParseFn = fn(&str, &Url) -> Vec<Candidate>;

/// One candidate selector pattern for the DOM strategy.
#[derive(Debug)]
pub struct DomPattern {
    /// Selector for one result block.
    pub container: &'static str,
    /// Selectors tried in order inside the block for the headline text.
    /// When none match, the link text is used.
    pub title: &'static [&'static str],
    /// Selector for the link inside the block; `None` means the block is the link.
    pub link: Option<&'static str>,
    /// Attribute on the block carrying the headline, checked before `title`.
    pub title_attr: Option<&'static str>,
    /// Attribute on the block carrying the target URL, checked before `link`.
    pub url_attr: Option<&'static str>,
    /// Headlines shorter than this many characters are navigation noise.
    pub min_title_chars: usize,
}

/// A page-level extraction strategy.
#[derive(Debug)]
pub enum Strategy {
    Structured(ParseFn),
    Dom(&'static [DomPattern]),
}

/// Secondary endpoint queried only when the search page yields nothing.
#[derive(Debug)]
pub struct ApiStrategy {
    /// Default URL template, containing `{keyword}`.
    pub template: &'static str,
    pub parse: ParseFn,
}

/// A link-wrapping redirect whose real target sits in a query parameter.
#[derive(Debug)]
pub struct RedirectRule {
    /// Path suffix identifying the redirect endpoint, e.g. `/url`.
    pub path_suffix: &'static str,
    /// Query parameters that may carry the target, in priority order.
    pub params: &'static [&'static str],
}

/// Ordered extraction strategies for one platform.
#[derive(Debug)]
pub struct StrategyChain {
    /// Applied to the search page body, first non-empty wins.
    pub page: &'static [Strategy],
    pub fallback_api: Option<ApiStrategy>,
    pub redirects: &'static [RedirectRule],
}

/// A registered platform with its endpoints resolved against the settings.
#[derive(Debug, Clone)]
pub struct Platform {
    pub id: PlatformId,
    pub search_template: String,
    pub api_template: Option<String>,
    pub chain: &'static StrategyChain,
}

impl Platform {
    fn builtin(id: PlatformId) -> Self {
        let (search, chain) = match id {
            PlatformId::Toutiao => (toutiao::SEARCH_TEMPLATE, &toutiao::CHAIN),
            PlatformId::Google => (google::SEARCH_TEMPLATE, &google::CHAIN),
            PlatformId::Bing => (bing::SEARCH_TEMPLATE, &bing::CHAIN),
        };
        Self {
            id,
            search_template: search.to_string(),
            api_template: chain.fallback_api.as_ref().map(|api| api.template.to_string()),
            chain,
        }
    }

    /// Search page URL for `keyword`.
    pub fn search_url(&self, keyword: &str) -> Result<Url, FetchError> {
        expand_template(self.id, &self.search_template, keyword)
    }

    /// Fallback API URL for `keyword`, if the platform has one.
    pub fn api_url(&self, keyword: &str) -> Option<Result<Url, FetchError>> {
        self.api_template
            .as_deref()
            .map(|template| expand_template(self.id, template, keyword))
    }
}

fn expand_template(platform: PlatformId, template: &str, keyword: &str) -> Result<Url, FetchError> {
    let expanded = template.replace(KEYWORD_PLACEHOLDER, &urlencoding::encode(keyword));
    Url::parse(&expanded).map_err(|e| {
        FetchError::new(platform, FetchErrorKind::InvalidUrl, format!("{}: {}", expanded, e))
    })
}

/// The set of searchable platforms, in canonical order.
#[derive(Debug, Clone)]
pub struct Registry {
    platforms: Vec<Platform>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}

impl Registry {
    /// Build the registry, applying endpoint overrides from `settings`.
    pub fn new(settings: &Settings) -> Self {
        let platforms = PlatformId::ALL
            .into_iter()
            .map(|id| {
                let mut platform = Platform::builtin(id);
                if let Some(endpoint) = settings.endpoint(id) {
                    if let Some(search) = &endpoint.search {
                        platform.search_template = search.clone();
                    }
                    if let Some(api) = &endpoint.api {
                        platform.api_template = Some(api.clone());
                    }
                    debug!(platform = %id, search = %platform.search_template, "Endpoint override applied");
                }
                platform
            })
            .collect();
        Self { platforms }
    }

    pub fn get(&self, id: PlatformId) -> Option<&Platform> {
        self.platforms.iter().find(|p| p.id == id)
    }

    /// Registered identifiers in canonical order.
    pub fn ids(&self) -> Vec<PlatformId> {
        self.platforms.iter().map(|p| p.id).collect()
    }

    pub fn contains(&self, id: PlatformId) -> bool {
        self.get(id).is_some()
    }

    /// Turn user-supplied platform names into identifiers.
    ///
    /// Blank names are ignored, duplicates collapse onto their first
    /// occurrence, and an empty selection expands to every registered
    /// platform.
    ///
    /// # Errors
    ///
    /// [`ValidationError::UnknownPlatform`] naming the first unrecognized
    /// name; nothing is silently dropped.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<PlatformId>, ValidationError> {
        let mut resolved: Vec<PlatformId> = Vec::new();
        for name in names.iter().map(|n| n.as_ref()).filter(|n| !n.trim().is_empty()) {
            let id: PlatformId = name.parse()?;
            if !self.contains(id) {
                return Err(ValidationError::UnknownPlatform(name.trim().to_string()));
            }
            if !resolved.contains(&id) {
                resolved.push(id);
            }
        }
        if resolved.is_empty() {
            resolved = self.ids();
        }
        Ok(resolved)
    }

    /// Validate a keyword and platform names into a [`SearchRequest`].
    pub fn request<S: AsRef<str>>(
        &self,
        keyword: &str,
        names: &[S],
    ) -> Result<SearchRequest, ValidationError> {
        let platforms = self.resolve(names)?;
        SearchRequest::new(keyword, platforms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointOverride;

    #[test]
    fn test_resolve_empty_expands_to_all_in_canonical_order() {
        let registry = Registry::default();
        let empty: [&str; 0] = [];
        assert_eq!(
            registry.resolve(&empty).unwrap(),
            vec![PlatformId::Toutiao, PlatformId::Google, PlatformId::Bing]
        );
        assert_eq!(registry.resolve(&["", " "]).unwrap().len(), 3);
    }

    #[test]
    fn test_resolve_keeps_request_order_and_dedups() {
        let registry = Registry::default();
        let resolved = registry.resolve(&["Bing", "toutiao", "bing"]).unwrap();
        assert_eq!(resolved, vec![PlatformId::Bing, PlatformId::Toutiao]);
    }

    #[test]
    fn test_resolve_rejects_unknown_platform() {
        let registry = Registry::default();
        let err = registry.resolve(&["bing", "foobar"]).unwrap_err();
        assert_eq!(err, ValidationError::UnknownPlatform("foobar".to_string()));
    }

    #[test]
    fn test_search_url_encodes_keyword() {
        let registry = Registry::default();
        let bing = registry.get(PlatformId::Bing).unwrap();
        let url = bing.search_url("人工智能 news").unwrap();
        assert_eq!(url.host_str(), Some("www.bing.com"));
        assert!(url.as_str().contains("q=%E4%BA%BA%E5%B7%A5%E6%99%BA%E8%83%BD%20news"));
    }

    #[test]
    fn test_google_has_no_fallback_api() {
        let registry = Registry::default();
        assert!(registry.get(PlatformId::Google).unwrap().api_url("x").is_none());
        assert!(registry.get(PlatformId::Bing).unwrap().api_url("x").is_some());
        assert!(registry.get(PlatformId::Toutiao).unwrap().api_url("x").is_some());
    }

    #[test]
    fn test_endpoint_override_applied() {
        let mut settings = Settings::default();
        settings.endpoints.insert(
            PlatformId::Google,
            EndpointOverride {
                search: Some("http://127.0.0.1:9/search?q={keyword}".to_string()),
                api: None,
            },
        );
        let registry = Registry::new(&settings);
        let url = registry.get(PlatformId::Google).unwrap().search_url("rust").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9/search?q=rust");
    }

    #[test]
    fn test_invalid_template_is_fetch_error() {
        let mut platform = Platform::builtin(PlatformId::Bing);
        platform.search_template = "not a url {keyword}".to_string();
        let err = platform.search_url("x").unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::InvalidUrl);
    }
}

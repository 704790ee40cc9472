//! Data models for search requests, per-platform outcomes and the merged result document.
//!
//! This module defines the core data structures used throughout the crate:
//! - [`PlatformId`]: The closed set of news platforms that can be searched
//! - [`SearchRequest`]: A validated keyword plus the platforms to query
//! - [`ResultItem`]: One (title, url) hit attributed to a platform
//! - [`PlatformOutcome`]: Everything one platform produced during a run
//! - [`ResultDocument`]: The single artifact handed to the sink
//!
//! Field names of [`ResultDocument`] follow the JSON schema consumed by the
//! publishing side (`generatedAt` is camelCase there).

use crate::error::{FetchError, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A searchable news platform.
///
/// The declaration order is the canonical registry order: results are always
/// merged toutiao first, then google, then bing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformId {
    /// Toutiao (今日头条) news search.
    Toutiao,
    /// Google News search (`tbm=nws`).
    Google,
    /// Bing News search.
    Bing,
}

impl PlatformId {
    /// Every platform, in canonical order.
    pub const ALL: [PlatformId; 3] = [PlatformId::Toutiao, PlatformId::Google, PlatformId::Bing];

    /// Lower-case identifier used on the command line and in JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformId::Toutiao => "toutiao",
            PlatformId::Google => "google",
            PlatformId::Bing => "bing",
        }
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        PlatformId::ALL
            .into_iter()
            .find(|id| id.as_str() == needle)
            .ok_or_else(|| ValidationError::UnknownPlatform(s.trim().to_string()))
    }
}

/// A validated search request.
///
/// Construct through [`SearchRequest::new`] (already-typed platforms) or
/// [`crate::platforms::Registry::request`] (raw names from the command line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    keyword: String,
    platforms: Vec<PlatformId>,
}

impl SearchRequest {
    /// Build a request, trimming the keyword and collapsing duplicate platforms.
    ///
    /// An empty platform list expands to every platform in canonical order.
    ///
    /// # Errors
    ///
    /// [`ValidationError::EmptyKeyword`] if the keyword is blank.
    pub fn new(
        keyword: impl Into<String>,
        platforms: impl IntoIterator<Item = PlatformId>,
    ) -> Result<Self, ValidationError> {
        let keyword = keyword.into().trim().to_string();
        if keyword.is_empty() {
            return Err(ValidationError::EmptyKeyword);
        }

        let mut unique: Vec<PlatformId> = Vec::new();
        for id in platforms {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        if unique.is_empty() {
            unique = PlatformId::ALL.to_vec();
        }

        Ok(Self {
            keyword,
            platforms: unique,
        })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Requested platforms in the order the caller listed them.
    pub fn platforms(&self) -> &[PlatformId] {
        &self.platforms
    }
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultItem {
    /// Headline text, trimmed and never empty.
    pub title: String,
    /// Absolute http(s) URL of the story.
    pub url: String,
    /// Platform the hit was found on.
    pub platform: PlatformId,
}

/// Which link in a platform's strategy chain produced the accepted items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// JSON-LD, JSON bodies or JSON embedded in page scripts.
    Structured,
    /// CSS selector patterns over the search page markup.
    Dom,
    /// A secondary unauthenticated JSON or RSS endpoint.
    FallbackApi,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StrategyKind::Structured => "structured",
            StrategyKind::Dom => "dom",
            StrategyKind::FallbackApi => "fallback_api",
        };
        f.write_str(s)
    }
}

/// The result of searching a single platform.
///
/// Zero items with no error is a legitimate outcome (nothing matched, or an
/// anti-bot page came back with a 200).
#[derive(Debug, Clone)]
pub struct PlatformOutcome {
    pub platform: PlatformId,
    /// Deduplicated and capped hits, in source order.
    pub items: Vec<ResultItem>,
    /// Set when the platform could not be fetched.
    pub error: Option<FetchError>,
    /// Strategy that produced `items`, if any did.
    pub strategy: Option<StrategyKind>,
    /// Number of primary fetch attempts made (1 or 2).
    pub attempts: u32,
    pub elapsed: Duration,
}

impl PlatformOutcome {
    pub fn failed(platform: PlatformId, error: FetchError, attempts: u32, elapsed: Duration) -> Self {
        Self {
            platform,
            items: Vec::new(),
            error: Some(error),
            strategy: None,
            attempts,
            elapsed,
        }
    }
}

/// Per-platform diagnostic kept alongside the document for logs; never serialized.
#[derive(Debug, Clone)]
pub struct PlatformDiagnostic {
    pub platform: PlatformId,
    pub item_count: usize,
    pub strategy: Option<StrategyKind>,
    pub error: Option<FetchError>,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// The merged output of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultDocument {
    pub keyword: String,
    /// Always equal to `results.len()`.
    pub total: usize,
    /// Requested platforms, in request order.
    pub platforms: Vec<PlatformId>,
    /// Hits grouped by platform in canonical order.
    pub results: Vec<ResultItem>,
    #[serde(rename = "generatedAt")]
    pub generated_at: DateTime<Utc>,
    #[serde(skip)]
    pub diagnostics: Vec<PlatformDiagnostic>,
}

impl ResultDocument {
    /// Assemble the document from the platform outcomes of one run.
    ///
    /// Outcomes are concatenated in canonical order regardless of the order
    /// they are passed in; only outcomes for requested platforms are used.
    pub fn from_outcomes(request: &SearchRequest, mut outcomes: Vec<PlatformOutcome>) -> Self {
        outcomes.retain(|o| request.platforms().contains(&o.platform));
        outcomes.sort_by_key(|o| o.platform);

        let mut results = Vec::new();
        let mut diagnostics = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            diagnostics.push(PlatformDiagnostic {
                platform: outcome.platform,
                item_count: outcome.items.len(),
                strategy: outcome.strategy,
                error: outcome.error,
                attempts: outcome.attempts,
                elapsed: outcome.elapsed,
            });
            results.extend(outcome.items);
        }

        Self {
            keyword: request.keyword().to_string(),
            total: results.len(),
            platforms: request.platforms().to_vec(),
            results,
            generated_at: Utc::now(),
            diagnostics,
        }
    }

    /// Platforms whose fetch failed during this run.
    pub fn failed_platforms(&self) -> Vec<PlatformId> {
        self.diagnostics
            .iter()
            .filter(|d| d.error.is_some())
            .map(|d| d.platform)
            .collect()
    }
}

//! HTTP fetching of platform search pages and fallback APIs.
//!
//! One [`Fetcher`] (wrapping one `reqwest::Client`) is built per run and
//! borrowed by every platform task. Every failure comes back as a tagged
//! [`FetchError`]; this layer never retries.

use crate::config::Settings;
use crate::error::{FetchError, FetchErrorKind};
use crate::models::PlatformId;
use crate::platforms::Platform;
use crate::utils::truncate_for_log;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderValue};
use std::time::Instant;
use tracing::{debug, instrument, warn};
use url::Url;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// A successful response body.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub platform: PlatformId,
    /// Final URL after redirects; relative links resolve against it.
    pub url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl RawResponse {
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("json"))
    }
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Build the shared client with a browser-like identity and the per-request timeout.
    pub fn new(settings: &Settings) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        match HeaderValue::from_str(&settings.accept_language) {
            Ok(lang) => {
                headers.insert(ACCEPT_LANGUAGE, lang);
            }
            Err(e) => warn!(
                accept_language = %truncate_for_log(&settings.accept_language, 60),
                error = %e,
                "Invalid Accept-Language in settings; header not sent"
            ),
        }

        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .default_headers(headers)
            .timeout(settings.timeout())
            .connect_timeout(settings.timeout())
            .gzip(true)
            .build()?;
        Ok(Self { client })
    }

    /// Fetch the search page of `platform` for `keyword`.
    pub async fn fetch(&self, platform: &Platform, keyword: &str) -> Result<RawResponse, FetchError> {
        let url = platform.search_url(keyword)?;
        self.fetch_url(platform.id, url).await
    }

    /// GET `url` on behalf of `platform`.
    #[instrument(level = "info", skip_all, fields(%platform, %url))]
    pub async fn fetch_url(&self, platform: PlatformId, url: Url) -> Result<RawResponse, FetchError> {
        let t0 = Instant::now();
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(platform, &e))?;

        let status = resp.status();
        let final_url = resp.url().clone();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            warn!(status = status.as_u16(), elapsed_ms = t0.elapsed().as_millis() as u64, "Non-success status");
            return Err(FetchError::new(
                platform,
                FetchErrorKind::Status(status.as_u16()),
                status.canonical_reason().unwrap_or("unexpected status"),
            ));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(platform, &e))?;

        debug!(
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            content_type = content_type.as_deref().unwrap_or("-"),
            preview = %truncate_for_log(&body, 120),
            "Fetched"
        );

        Ok(RawResponse {
            platform,
            url: final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

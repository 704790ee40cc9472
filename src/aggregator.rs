//! Runs every requested platform in isolation and merges the outcomes.
//!
//! # Pipeline (per platform)
//!
//! 1. Fetch the search page, retrying once after a jittered pause if the
//!    failure was transient (timeout, refused or dropped connection)
//! 2. Run the platform's page strategies over the body
//! 3. If nothing came out, query the platform's fallback API (silently)
//!
//! Platforms run concurrently and every task is bounded by the run deadline.
//! The document is assembled only after all tasks settle, in canonical
//! platform order.

use crate::config::Settings;
use crate::error::{FetchError, FetchErrorKind, ValidationError};
use crate::extract::{self, Extraction};
use crate::fetcher::{Fetcher, RawResponse};
use crate::models::{PlatformId, PlatformOutcome, ResultDocument, SearchRequest};
use crate::platforms::{Platform, Registry};
use futures::stream::{self, StreamExt};
use rand::{Rng, rng};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, error, info, instrument, warn};

/// Owns the per-run resources: settings, registry and the shared HTTP client.
#[derive(Debug)]
pub struct Aggregator {
    settings: Settings,
    registry: Registry,
    fetcher: Fetcher,
}

impl Aggregator {
    pub fn new(settings: Settings) -> Result<Self, reqwest::Error> {
        let registry = Registry::new(&settings);
        let fetcher = Fetcher::new(&settings)?;
        Ok(Self {
            settings,
            registry,
            fetcher,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Search every platform in `request` and merge the results.
    ///
    /// # Errors
    ///
    /// Only [`ValidationError`]: a request naming a platform this registry
    /// does not know. Per-platform failures are absorbed into the document's
    /// diagnostics and the run still completes.
    #[instrument(level = "info", skip_all, fields(keyword = %request.keyword()))]
    pub async fn run(&self, request: &SearchRequest) -> Result<ResultDocument, ValidationError> {
        if let Some(unknown) = request.platforms().iter().find(|id| !self.registry.contains(**id)) {
            return Err(ValidationError::UnknownPlatform(unknown.to_string()));
        }

        let t0 = Instant::now();
        let deadline = t0 + self.settings.deadline();
        let keyword = request.keyword();
        info!(platforms = ?request.platforms(), "Search starting");

        let outcomes: Vec<PlatformOutcome> = stream::iter(request.platforms().iter().copied())
            .map(|id| self.search_before(id, keyword, deadline))
            .buffer_unordered(self.settings.max_concurrency.max(1))
            .collect()
            .await;

        let document = ResultDocument::from_outcomes(request, outcomes);
        for d in &document.diagnostics {
            match &d.error {
                Some(e) => warn!(
                    platform = %d.platform,
                    attempts = d.attempts,
                    elapsed_ms = d.elapsed.as_millis() as u64,
                    error = %e,
                    "Platform failed"
                ),
                None if d.item_count == 0 => info!(
                    platform = %d.platform,
                    elapsed_ms = d.elapsed.as_millis() as u64,
                    "Platform returned no results"
                ),
                None => info!(
                    platform = %d.platform,
                    count = d.item_count,
                    strategy = ?d.strategy,
                    elapsed_ms = d.elapsed.as_millis() as u64,
                    "Platform succeeded"
                ),
            }
        }

        let failed = document.failed_platforms();
        if !failed.is_empty() && failed.len() == document.platforms.len() {
            error!(?failed, "Every platform failed");
        }
        info!(
            total = document.total,
            failed = failed.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Search complete"
        );
        Ok(document)
    }

    /// Search one platform, giving up at `deadline`.
    async fn search_before(&self, id: PlatformId, keyword: &str, deadline: Instant) -> PlatformOutcome {
        let t0 = Instant::now();
        let Some(platform) = self.registry.get(id) else {
            let e = FetchError::new(id, FetchErrorKind::InvalidUrl, "platform not registered");
            return PlatformOutcome::failed(id, e, 0, Duration::ZERO);
        };

        let attempts = AtomicU32::new(0);
        match timeout_at(deadline, self.search_platform(platform, keyword, &attempts)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                let e = FetchError::new(id, FetchErrorKind::Deadline, "run deadline elapsed before platform finished");
                PlatformOutcome::failed(id, e, attempts.load(Ordering::Relaxed), t0.elapsed())
            }
        }
    }

    #[instrument(level = "info", skip_all, fields(platform = %platform.id))]
    async fn search_platform(&self, platform: &Platform, keyword: &str, attempts: &AtomicU32) -> PlatformOutcome {
        let t0 = Instant::now();
        let fetched = self.fetch_with_retry(platform, keyword, attempts).await;
        let attempts = attempts.load(Ordering::Relaxed);

        let raw = match fetched {
            Ok(raw) => raw,
            Err(e) => return PlatformOutcome::failed(platform.id, e, attempts, t0.elapsed()),
        };

        let max = self.settings.max_per_platform;
        let mut extraction = extract::extract_page(platform.id, platform.chain, &raw.body, &raw.url, max);
        if extraction.items.is_empty() {
            debug!(bytes = raw.body.len(), json = raw.is_json(), "Search page yielded nothing");
            extraction = self.fallback_api(platform, keyword).await;
        }

        PlatformOutcome {
            platform: platform.id,
            items: extraction.items,
            error: None,
            strategy: extraction.strategy,
            attempts,
            elapsed: t0.elapsed(),
        }
    }

    /// Fetch the search page; one retry for transient failures only.
    ///
    /// `attempts` is bumped as each request goes out, so a caller that gives
    /// up midway still sees how far this got.
    async fn fetch_with_retry(
        &self,
        platform: &Platform,
        keyword: &str,
        attempts: &AtomicU32,
    ) -> Result<RawResponse, FetchError> {
        attempts.fetch_add(1, Ordering::Relaxed);
        match self.fetcher.fetch(platform, keyword).await {
            Err(e) if e.is_transient() => {
                let jitter_ms: u64 = rng().random_range(0..=250);
                let delay = self.settings.retry_delay() + Duration::from_millis(jitter_ms);
                warn!(error = %e, ?delay, "Transient fetch failure; retrying once");
                sleep(delay).await;
                attempts.fetch_add(1, Ordering::Relaxed);
                self.fetcher.fetch(platform, keyword).await
            }
            other => other,
        }
    }

    /// Last link of the chain. Failures here are expected (signature checks,
    /// rate limits) and only logged at debug level.
    async fn fallback_api(&self, platform: &Platform, keyword: &str) -> Extraction {
        let url = match platform.api_url(keyword) {
            Some(Ok(url)) => url,
            Some(Err(e)) => {
                debug!(error = %e, "Fallback API template unusable");
                return Extraction::default();
            }
            None => return Extraction::default(),
        };

        match self.fetcher.fetch_url(platform.id, url).await {
            Ok(raw) => {
                let extraction = extract::extract_api(
                    platform.id,
                    platform.chain,
                    &raw.body,
                    &raw.url,
                    self.settings.max_per_platform,
                );
                debug!(count = extraction.items.len(), "Fallback API parsed");
                extraction
            }
            Err(e) => {
                debug!(error = %e, "Fallback API failed");
                Extraction::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointOverride;
    use crate::models::StrategyKind;
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn bing_cards(prefix: &str, n: usize) -> String {
        let cards: String = (0..n)
            .map(|i| {
                format!(
                    r#"<div class="news-card" data-title="{prefix} headline {i}" data-url="https://news.example/{prefix}/{i}"><a class="title" href="https://news.example/{prefix}/{i}">{prefix} headline {i}</a></div>"#
                )
            })
            .collect();
        format!("<html><body>{}</body></html>", cards)
    }

    fn toutiao_cards(n: usize) -> String {
        let cards: String = (0..n)
            .map(|i| {
                format!(
                    r#"<div data-druid-card-data-id="{i}"><a href="https://www.toutiao.com/article/{i}/">头条新闻标题第{i}条</a></div>"#
                )
            })
            .collect();
        format!("<html><body>{}</body></html>", cards)
    }

    fn google_blocks(n: usize) -> String {
        let blocks: String = (0..n)
            .map(|i| format!(r#"<div class="g"><a href="/url?q=https://g.example/{i}&amp;sa=U"><h3>Google story {i}</h3></a></div>"#))
            .collect();
        format!("<html><body>{}</body></html>", blocks)
    }

    /// Point every platform at `server`: search pages under `/<id>/search`,
    /// fallback APIs under `/<id>/api`.
    fn settings_for(server: &MockServer) -> Settings {
        let mut settings = Settings::default();
        settings.timeout_secs = 1;
        settings.retry_delay_ms = 10;
        for id in PlatformId::ALL {
            settings.endpoints.insert(
                id,
                EndpointOverride {
                    search: Some(format!("{}?q={{keyword}}", server.url(format!("/{}/search", id)))),
                    api: Some(format!("{}?q={{keyword}}", server.url(format!("/{}/api", id)))),
                },
            );
        }
        settings
    }

    #[tokio::test]
    async fn test_bing_scenario_three_results() {
        let server = MockServer::start();
        let page = server.mock(|when, then| {
            when.method(GET).path("/bing/search").query_param("q", "人工智能");
            then.status(200)
                .header("content-type", "text/html; charset=utf-8")
                .body(bing_cards("ai", 3));
        });

        let aggregator = Aggregator::new(settings_for(&server)).unwrap();
        let request = aggregator.registry().request("人工智能", &["bing"]).unwrap();
        let doc = aggregator.run(&request).await.unwrap();
        page.assert();

        assert_eq!(doc.keyword, "人工智能");
        assert_eq!(doc.total, 3);
        assert_eq!(doc.platforms, vec![PlatformId::Bing]);
        assert_eq!(doc.results.len(), 3);
        assert!(doc.results.iter().all(|r| r.platform == PlatformId::Bing));

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["platforms"], serde_json::json!(["bing"]));
        assert_eq!(json["results"][2]["url"], "https://news.example/ai/2");
        assert_eq!(json["results"][0]["platform"], "bing");
    }

    #[tokio::test]
    async fn test_failing_platform_is_isolated() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/toutiao/search");
            then.status(200).body(toutiao_cards(2));
        });
        let google = server.mock(|when, then| {
            when.method(GET).path("/google/search");
            then.status(500);
        });
        server.mock(|when, then| {
            when.method(GET).path("/bing/search");
            then.status(200).body(bing_cards("b", 4));
        });

        let aggregator = Aggregator::new(settings_for(&server)).unwrap();
        let request = SearchRequest::new("rust", []).unwrap();
        let doc = aggregator.run(&request).await.unwrap();

        assert_eq!(google.calls(), 1, "HTTP errors are not retried");
        assert_eq!(doc.total, 6);
        assert_eq!(doc.total, doc.results.len());
        assert!(doc.platforms.contains(&PlatformId::Google));
        assert!(doc.results.iter().all(|r| r.platform != PlatformId::Google));
        assert_eq!(doc.failed_platforms(), vec![PlatformId::Google]);

        let google_diag = doc.diagnostics.iter().find(|d| d.platform == PlatformId::Google).unwrap();
        assert_eq!(google_diag.error.as_ref().unwrap().kind, FetchErrorKind::Status(500));
    }

    #[tokio::test]
    async fn test_results_follow_canonical_order() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/bing/search");
            then.status(200).body(bing_cards("b", 2));
        });
        server.mock(|when, then| {
            when.method(GET).path("/toutiao/search");
            // Toutiao answers last; order must not depend on it.
            then.status(200).delay(Duration::from_millis(200)).body(toutiao_cards(2));
        });
        let google = server.mock(|when, then| {
            when.method(GET).path("/google/search");
            then.status(200).body(google_blocks(2));
        });

        let aggregator = Aggregator::new(settings_for(&server)).unwrap();
        let request = aggregator.registry().request("rust", &["bing", "toutiao"]).unwrap();
        let doc = aggregator.run(&request).await.unwrap();

        assert_eq!(google.calls(), 0);
        assert_eq!(doc.platforms, vec![PlatformId::Bing, PlatformId::Toutiao]);
        let order: Vec<PlatformId> = doc.results.iter().map(|r| r.platform).collect();
        assert_eq!(
            order,
            vec![PlatformId::Toutiao, PlatformId::Toutiao, PlatformId::Bing, PlatformId::Bing]
        );
    }

    #[tokio::test]
    async fn test_unknown_platform_rejected_before_network() {
        let server = MockServer::start();
        let any = server.mock(|when, then| {
            when.method(GET);
            then.status(200).body(bing_cards("x", 1));
        });

        let aggregator = Aggregator::new(settings_for(&server)).unwrap();
        let err = aggregator.registry().request("rust", &["bing", "foobar"]).unwrap_err();

        assert_eq!(err, ValidationError::UnknownPlatform("foobar".to_string()));
        assert_eq!(any.calls(), 0);
    }

    #[tokio::test]
    async fn test_timeout_is_retried_once() {
        let server = MockServer::start();
        let slow = server.mock(|when, then| {
            when.method(GET).path("/bing/search");
            then.status(200).delay(Duration::from_millis(1500)).body(bing_cards("b", 1));
        });

        let aggregator = Aggregator::new(settings_for(&server)).unwrap();
        let request = SearchRequest::new("rust", [PlatformId::Bing]).unwrap();
        let doc = aggregator.run(&request).await.unwrap();

        assert_eq!(slow.calls(), 2);
        assert_eq!(doc.total, 0);
        let diag = &doc.diagnostics[0];
        assert_eq!(diag.attempts, 2);
        assert_eq!(diag.error.as_ref().unwrap().kind, FetchErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let server = MockServer::start();
        let missing = server.mock(|when, then| {
            when.method(GET).path("/toutiao/search");
            then.status(404);
        });

        let aggregator = Aggregator::new(settings_for(&server)).unwrap();
        let request = SearchRequest::new("rust", [PlatformId::Toutiao]).unwrap();
        let doc = aggregator.run(&request).await.unwrap();

        assert_eq!(missing.calls(), 1);
        assert_eq!(doc.diagnostics[0].attempts, 1);
        assert_eq!(doc.total, 0);
    }

    #[tokio::test]
    async fn test_fallback_api_used_when_page_is_empty() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/bing/search");
            then.status(200).body("<html><body><div id=\"challenge\">Verify you are human</div></body></html>");
        });
        let api = server.mock(|when, then| {
            when.method(GET).path("/bing/api");
            then.status(200)
                .header("content-type", "application/rss+xml")
                .body(
                    r#"<rss><channel>
                    <item><title>Feed story one</title><link>https://feed.example/1</link></item>
                    <item><title>Feed story two</title><link>https://feed.example/2</link></item>
                    </channel></rss>"#,
                );
        });

        let aggregator = Aggregator::new(settings_for(&server)).unwrap();
        let request = SearchRequest::new("rust", [PlatformId::Bing]).unwrap();
        let doc = aggregator.run(&request).await.unwrap();

        api.assert();
        assert_eq!(doc.total, 2);
        assert_eq!(doc.diagnostics[0].strategy, Some(StrategyKind::FallbackApi));
    }

    #[tokio::test]
    async fn test_challenge_page_yields_empty_outcome_not_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/toutiao/search");
            then.status(200).body("<html><body>请完成安全验证</body></html>");
        });
        server.mock(|when, then| {
            when.method(GET).path("/toutiao/api");
            then.status(403);
        });

        let aggregator = Aggregator::new(settings_for(&server)).unwrap();
        let request = SearchRequest::new("人工智能", [PlatformId::Toutiao]).unwrap();
        let doc = aggregator.run(&request).await.unwrap();

        assert_eq!(doc.total, 0);
        assert!(doc.failed_platforms().is_empty());
        assert_eq!(doc.diagnostics[0].item_count, 0);
        assert!(doc.diagnostics[0].error.is_none());
    }

    #[tokio::test]
    async fn test_results_capped_per_platform() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/bing/search");
            then.status(200).body(bing_cards("cap", 37));
        });

        let aggregator = Aggregator::new(settings_for(&server)).unwrap();
        let request = SearchRequest::new("rust", [PlatformId::Bing]).unwrap();
        let doc = aggregator.run(&request).await.unwrap();

        assert_eq!(doc.total, 10);
        assert_eq!(doc.results[0].title, "cap headline 0");
        assert_eq!(doc.results[9].title, "cap headline 9");
    }

    #[tokio::test]
    async fn test_run_deadline_marks_pending_platforms() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/google/search");
            then.status(200).delay(Duration::from_millis(3000)).body(google_blocks(1));
        });
        server.mock(|when, then| {
            when.method(GET).path("/bing/search");
            then.status(200).body(bing_cards("fast", 1));
        });

        let mut settings = settings_for(&server);
        settings.timeout_secs = 10;
        settings.deadline_secs = 1;
        let aggregator = Aggregator::new(settings).unwrap();
        let request = SearchRequest::new("rust", [PlatformId::Google, PlatformId::Bing]).unwrap();
        let doc = aggregator.run(&request).await.unwrap();

        assert_eq!(doc.total, 1);
        assert_eq!(doc.results[0].platform, PlatformId::Bing);
        let google = doc.diagnostics.iter().find(|d| d.platform == PlatformId::Google).unwrap();
        assert_eq!(google.error.as_ref().unwrap().kind, FetchErrorKind::Deadline);
        assert_eq!(google.attempts, 1);
    }

    #[tokio::test]
    async fn test_deadline_during_retry_counts_both_attempts() {
        let server = MockServer::start();
        let slow = server.mock(|when, then| {
            when.method(GET).path("/bing/search");
            then.status(200).delay(Duration::from_millis(5000)).body(bing_cards("b", 1));
        });

        // First attempt times out at 1s, the retry starts before 2s and is
        // still in flight when the deadline hits.
        let mut settings = settings_for(&server);
        settings.retry_delay_ms = 300;
        settings.deadline_secs = 2;
        let aggregator = Aggregator::new(settings).unwrap();
        let request = SearchRequest::new("rust", [PlatformId::Bing]).unwrap();
        let doc = aggregator.run(&request).await.unwrap();

        assert_eq!(slow.calls(), 2);
        let diag = &doc.diagnostics[0];
        assert_eq!(diag.error.as_ref().unwrap().kind, FetchErrorKind::Deadline);
        assert_eq!(diag.attempts, 2);
    }

    /// Serve a 200 that promises 5000 bytes, send a few, then hang up.
    async fn truncating_server() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = connections.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    let head = "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: 5000\r\n\r\n<html>partial";
                    let _ = socket.write_all(head.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        (format!("http://{}", addr), connections)
    }

    #[tokio::test]
    async fn test_connection_dropped_mid_body_is_retried() {
        let (origin, connections) = truncating_server().await;
        let mut settings = Settings::default();
        settings.retry_delay_ms = 10;
        settings.endpoints.insert(
            PlatformId::Bing,
            EndpointOverride {
                search: Some(format!("{}/bing/search?q={{keyword}}", origin)),
                api: None,
            },
        );

        let aggregator = Aggregator::new(settings).unwrap();
        let request = SearchRequest::new("rust", [PlatformId::Bing]).unwrap();
        let doc = aggregator.run(&request).await.unwrap();

        assert_eq!(connections.load(Ordering::SeqCst), 2);
        let diag = &doc.diagnostics[0];
        assert_eq!(diag.attempts, 2);
        assert_eq!(diag.error.as_ref().unwrap().kind, FetchErrorKind::Interrupted);
        assert_eq!(doc.total, 0);
    }
}

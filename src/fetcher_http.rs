//! HTTP-based page fetcher using reqwest.

use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, REFERER, USER_AGENT};
use reqwest::{redirect, Client, StatusCode};
use tracing::{debug, error, info, warn};

use crate::config::{HttpSettings, USER_AGENTS};
use crate::fetcher::{FetchOptions, PageFetcher};
use crate::{Result, SearchError};

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// A page fetcher that issues plain GET requests with browser-like headers.
///
/// Cheaper and faster than a browser but easier to block. Failed attempts
/// are retried with a linearly growing delay; there is no bot-challenge
/// detection.
pub struct PlainHttpFetcher {
    client: Client,
    settings: HttpSettings,
    user_agent: String,
}

impl PlainHttpFetcher {
    /// Creates a fetcher from settings.
    pub fn new(settings: HttpSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .redirect(redirect::Policy::limited(5))
            .build()?;
        Ok(Self::with_client(client, settings))
    }

    /// Creates a fetcher with a custom reqwest client.
    pub fn with_client(client: Client, settings: HttpSettings) -> Self {
        let user_agent = settings
            .user_agent
            .clone()
            .or_else(|| USER_AGENTS.choose(&mut rand::rng()).map(|ua| ua.to_string()))
            .unwrap_or_default();
        Self {
            client,
            settings,
            user_agent,
        }
    }

    pub fn settings(&self) -> &HttpSettings {
        &self.settings
    }

    async fn fetch_once(&self, url: &str, options: &FetchOptions) -> Result<String> {
        let user_agent = options.user_agent.as_deref().unwrap_or(&self.user_agent);
        let fetch_site = if options.referer.is_some() {
            "same-origin"
        } else {
            "none"
        };

        let mut request = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, &self.settings.accept_language)
            .header(CACHE_CONTROL, "max-age=0")
            .header("Upgrade-Insecure-Requests", "1")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-Site", fetch_site)
            .header("Sec-Fetch-User", "?1");

        if let Some(referer) = &options.referer {
            request = request.header(REFERER, referer);
        }
        for (name, value) in &options.extra_headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(timeout_ms) = options.timeout_ms {
            request = request.timeout(Duration::from_millis(timeout_ms));
        }

        let response = request.send().await.map_err(|e| classify(e, url))?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(SearchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(|e| classify(e, url))
    }
}

#[async_trait]
impl PageFetcher for PlainHttpFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<String> {
        let attempts = self.settings.max_retries.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(url, attempt, "HTTP fetch attempt");

            match self.fetch_once(url, options).await {
                Ok(html) => {
                    info!(url, attempt, bytes = html.len(), "HTTP fetch succeeded");
                    return Ok(html);
                }
                Err(e) if attempt >= attempts => {
                    error!(url, attempt, "HTTP fetch failed after {} attempts: {}", attempts, e);
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.settings.retry_delay_ms * u64::from(attempt);
                    warn!(url, attempt, "HTTP fetch failed: {}; retrying in {}ms", e, delay);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
            }
        }
    }

    fn kind(&self) -> &'static str {
        "http"
    }
}

/// Maps reqwest failures onto timeout / name-resolution / generic HTTP errors.
fn classify(err: reqwest::Error, url: &str) -> SearchError {
    if err.is_timeout() {
        return SearchError::Timeout(url.to_string());
    }
    if err.is_connect() && is_dns_failure(&err) {
        return SearchError::NameResolution(url.to_string());
    }
    SearchError::Http(err)
}

fn is_dns_failure(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        let msg = e.to_string().to_lowercase();
        if msg.contains("dns error")
            || msg.contains("failed to lookup address")
            || msg.contains("name or service not known")
            || msg.contains("no such host")
        {
            return true;
        }
        current = e.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(max_retries: u32) -> HttpSettings {
        HttpSettings {
            timeout_ms: 2_000,
            max_retries,
            retry_delay_ms: 20,
            ..Default::default()
        }
    }

    #[test]
    fn test_http_fetcher_new() {
        let fetcher = tokio_test::assert_ok!(PlainHttpFetcher::new(HttpSettings::default()));
        assert_eq!(fetcher.kind(), "http");
        assert!(USER_AGENTS.contains(&fetcher.user_agent.as_str()));
    }

    #[test]
    fn test_http_fetcher_fixed_user_agent() {
        let fetcher = PlainHttpFetcher::new(HttpSettings {
            user_agent: Some("TestBot/1.0".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(fetcher.user_agent, "TestBot/1.0");
    }

    #[tokio::test]
    async fn test_fetch_sends_browser_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(header("referer", "https://www.bing.com/"))
            .and(header("sec-fetch-mode", "navigate"))
            .and(header("x-extra", "yes"))
            .and(header_exists("user-agent"))
            .and(header_exists("accept-language"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = PlainHttpFetcher::new(settings(3)).unwrap();
        let options = FetchOptions::new()
            .with_referer("https://www.bing.com/")
            .with_header("X-Extra", "yes");
        let html = fetcher
            .fetch(&format!("{}/search", server.uri()), &options)
            .await
            .unwrap();
        assert_eq!(html, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_fetch_retries_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("second time lucky"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = PlainHttpFetcher::new(settings(3)).unwrap();
        let html = fetcher.fetch(&server.uri(), &FetchOptions::new()).await.unwrap();
        assert_eq!(html, "second time lucky");
    }

    #[tokio::test]
    async fn test_fetch_non_200_exhausts_retries_with_linear_delay() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(3)
            .mount(&server)
            .await;

        let fetcher = PlainHttpFetcher::new(settings(3)).unwrap();
        let start = Instant::now();
        let err = fetcher
            .fetch(&server.uri(), &FetchOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::HttpStatus { status: 404, .. }));
        // 20ms after the first attempt, 40ms after the second.
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_distinct() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let fetcher = PlainHttpFetcher::new(settings(1)).unwrap();
        let options = FetchOptions::new().with_timeout_ms(100);
        let err = fetcher.fetch(&server.uri(), &options).await.unwrap_err();
        assert!(matches!(err, SearchError::Timeout(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_fetch_unresolvable_host() {
        let fetcher = PlainHttpFetcher::new(settings(1)).unwrap();
        let err = fetcher
            .fetch("http://no-such-host.invalid/", &FetchOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::NameResolution(_)), "got {err:?}");
    }

    #[test]
    fn test_is_dns_failure_walks_sources() {
        #[derive(Debug)]
        struct Outer(std::io::Error);
        impl std::fmt::Display for Outer {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "error sending request")
            }
        }
        impl StdError for Outer {
            fn source(&self) -> Option<&(dyn StdError + 'static)> {
                Some(&self.0)
            }
        }

        let dns = Outer(std::io::Error::other("dns error: failed to lookup address information"));
        assert!(is_dns_failure(&dns));
        let refused = Outer(std::io::Error::other("connection refused"));
        assert!(!is_dns_failure(&refused));
    }
}

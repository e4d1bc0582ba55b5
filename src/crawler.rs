//! Fetch strategy selection and the HTTP-then-browser fallback composition.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, error, warn};

use crate::config::{BrowserSettings, CrawlerConfig};
use crate::fetcher::{FetchOptions, PageFetcher};
use crate::fetcher_http::PlainHttpFetcher;
use crate::{Result, SearchError};

/// Creates fresh fetchers for each search.
///
/// Every fetcher returned is owned by exactly one caller, who must close it.
pub trait FetcherFactory: Send + Sync {
    /// A fetcher for ordinary engines and URL fetches.
    fn create(&self) -> Result<Box<dyn PageFetcher>>;

    /// A browser fetcher for the protected engine's interactive path.
    fn create_protected(&self) -> Result<Box<dyn PageFetcher>>;
}

/// Builds fetchers from a [`CrawlerConfig`].
#[derive(Debug, Clone, Default)]
pub struct CrawlerSelector {
    config: CrawlerConfig,
}

impl CrawlerSelector {
    pub fn new(config: CrawlerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Builds the strategy named by `config.kind`.
    pub fn select(config: &CrawlerConfig) -> Result<Box<dyn PageFetcher>> {
        debug!(kind = %config.kind, "Selecting crawler");
        match config.kind.as_str() {
            "http" => {
                let settings = require(config.http.clone(), "http")?;
                Ok(Box::new(PlainHttpFetcher::new(settings)?))
            }
            "browser" => {
                let settings = require(config.browser.clone(), "browser")?;
                browser_fetcher(settings)
            }
            "fallback" => {
                let http = require(config.http.clone(), "http")?;
                let browser = require(config.browser.clone(), "browser")?;
                let primary = Box::new(PlainHttpFetcher::new(http)?);
                Ok(Box::new(FallbackFetcher::new(primary, move || {
                    browser_fetcher(browser.clone())
                })))
            }
            other => Err(SearchError::Configuration(format!(
                "Unknown crawler type '{}', expected one of: http, browser, fallback",
                other
            ))),
        }
    }

    /// Builds the browser fetcher used for the protected engine.
    ///
    /// Uses the configured browser settings, or defaults when none are set.
    pub fn select_protected(config: &CrawlerConfig) -> Result<Box<dyn PageFetcher>> {
        browser_fetcher(config.browser.clone().unwrap_or_default())
    }
}

impl FetcherFactory for CrawlerSelector {
    fn create(&self) -> Result<Box<dyn PageFetcher>> {
        Self::select(&self.config)
    }

    fn create_protected(&self) -> Result<Box<dyn PageFetcher>> {
        Self::select_protected(&self.config)
    }
}

fn require<T>(settings: Option<T>, section: &str) -> Result<T> {
    settings.ok_or_else(|| {
        SearchError::Configuration(format!("Missing '{}' crawler settings", section))
    })
}

#[cfg(feature = "headless")]
fn browser_fetcher(settings: BrowserSettings) -> Result<Box<dyn PageFetcher>> {
    Ok(Box::new(crate::browser::ChromeFetcher::from_settings(settings)))
}

#[cfg(not(feature = "headless"))]
fn browser_fetcher(_settings: BrowserSettings) -> Result<Box<dyn PageFetcher>> {
    Err(SearchError::Configuration(
        "Browser crawling requires the 'headless' feature".to_string(),
    ))
}

type FallbackBuilder = Box<dyn Fn() -> Result<Box<dyn PageFetcher>> + Send + Sync>;

/// Tries the primary fetcher, then a lazily built fallback for the same URL.
pub struct FallbackFetcher {
    primary: Box<dyn PageFetcher>,
    build_fallback: FallbackBuilder,
    fallback: OnceCell<Box<dyn PageFetcher>>,
}

impl FallbackFetcher {
    pub fn new<F>(primary: Box<dyn PageFetcher>, build_fallback: F) -> Self
    where
        F: Fn() -> Result<Box<dyn PageFetcher>> + Send + Sync + 'static,
    {
        Self {
            primary,
            build_fallback: Box::new(build_fallback),
            fallback: OnceCell::new(),
        }
    }

    /// Whether the fallback strategy has been constructed.
    pub fn fallback_started(&self) -> bool {
        self.fallback.initialized()
    }
}

#[async_trait]
impl PageFetcher for FallbackFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<String> {
        let primary_err = match self.primary.fetch(url, options).await {
            Ok(html) => return Ok(html),
            Err(e) => e,
        };

        warn!(
            url,
            primary = self.primary.kind(),
            "Primary fetch failed: {}. Trying fallback",
            primary_err
        );

        let fallback = match self
            .fallback
            .get_or_try_init(|| async { (self.build_fallback)() })
            .await
        {
            Ok(fallback) => fallback,
            Err(e) => {
                error!(url, "Could not build fallback fetcher: {}", e);
                return Err(SearchError::Fallback {
                    primary: Box::new(primary_err),
                    fallback: Box::new(e),
                });
            }
        };

        fallback.fetch(url, options).await.map_err(|e| {
            error!(url, "Fallback fetch failed as well: {}", e);
            SearchError::Fallback {
                primary: Box::new(primary_err),
                fallback: Box::new(e),
            }
        })
    }

    async fn close(&self) -> Result<()> {
        let primary = self.primary.close().await;
        let fallback = match self.fallback.get() {
            Some(fallback) => fallback.close().await,
            None => Ok(()),
        };
        primary.and(fallback)
    }

    fn kind(&self) -> &'static str {
        "fallback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpSettings;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counters {
        fetches: AtomicU32,
        closes: AtomicU32,
    }

    struct StubFetcher {
        html: Option<&'static str>,
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &str, _options: &FetchOptions) -> Result<String> {
            self.counters.fetches.fetch_add(1, Ordering::SeqCst);
            match self.html {
                Some(html) => Ok(html.to_string()),
                None => Err(SearchError::HttpStatus {
                    status: 503,
                    url: url.to_string(),
                }),
            }
        }

        async fn close(&self) -> Result<()> {
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn kind(&self) -> &'static str {
            "stub"
        }
    }

    fn fallback_with(
        primary: Option<&'static str>,
        secondary: Option<&'static str>,
    ) -> (FallbackFetcher, Arc<Counters>, Arc<Counters>) {
        let p = Arc::new(Counters::default());
        let s = Arc::new(Counters::default());
        let s_clone = Arc::clone(&s);
        let fetcher = FallbackFetcher::new(
            Box::new(StubFetcher {
                html: primary,
                counters: Arc::clone(&p),
            }),
            move || {
                Ok(Box::new(StubFetcher {
                    html: secondary,
                    counters: Arc::clone(&s_clone),
                }) as Box<dyn PageFetcher>)
            },
        );
        (fetcher, p, s)
    }

    #[test]
    fn test_select_http() {
        let fetcher = CrawlerSelector::select(&CrawlerConfig::http(HttpSettings::default())).unwrap();
        assert_eq!(fetcher.kind(), "http");
    }

    #[test]
    fn test_select_fallback_default() {
        let fetcher = CrawlerSelector::select(&CrawlerConfig::default()).unwrap();
        assert_eq!(fetcher.kind(), "fallback");
    }

    #[test]
    fn test_select_unknown_type_is_configuration_error() {
        let config = CrawlerConfig {
            kind: "carrier-pigeon".to_string(),
            ..Default::default()
        };
        let err = CrawlerSelector::select(&config).err().unwrap();
        assert!(matches!(err, SearchError::Configuration(_)));
        assert!(!err.is_network());
    }

    #[test]
    fn test_select_missing_settings_is_configuration_error() {
        let config = CrawlerConfig {
            kind: "http".to_string(),
            browser: None,
            http: None,
        };
        assert!(matches!(
            CrawlerSelector::select(&config).err().unwrap(),
            SearchError::Configuration(_)
        ));

        let config = CrawlerConfig {
            kind: "fallback".to_string(),
            browser: None,
            http: Some(HttpSettings::default()),
        };
        assert!(matches!(
            CrawlerSelector::select(&config).err().unwrap(),
            SearchError::Configuration(_)
        ));
    }

    #[cfg(feature = "headless")]
    #[test]
    fn test_select_browser() {
        let fetcher = CrawlerSelector::select(&CrawlerConfig::browser(BrowserSettings::default())).unwrap();
        assert_eq!(fetcher.kind(), "browser");
        let protected = CrawlerSelector::select_protected(&CrawlerConfig::http(HttpSettings::default())).unwrap();
        assert_eq!(protected.kind(), "browser");
    }

    #[cfg(not(feature = "headless"))]
    #[test]
    fn test_select_browser_without_feature() {
        let err = CrawlerSelector::select(&CrawlerConfig::browser(BrowserSettings::default()))
            .err()
            .unwrap();
        assert!(matches!(err, SearchError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_fallback_not_used_when_primary_succeeds() {
        let (fetcher, primary, secondary) = fallback_with(Some("<p>http</p>"), Some("<p>browser</p>"));
        let html = fetcher.fetch("https://a/", &FetchOptions::new()).await.unwrap();
        assert_eq!(html, "<p>http</p>");
        assert!(!fetcher.fallback_started());
        fetcher.close().await.unwrap();
        assert_eq!(primary.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(primary.closes.load(Ordering::SeqCst), 1);
        assert_eq!(secondary.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(secondary.closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fallback_used_when_primary_fails() {
        let (fetcher, primary, secondary) = fallback_with(None, Some("<p>browser</p>"));
        let html = fetcher.fetch("https://a/", &FetchOptions::new()).await.unwrap();
        assert_eq!(html, "<p>browser</p>");
        assert!(fetcher.fallback_started());
        fetcher.close().await.unwrap();
        assert_eq!(primary.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(secondary.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(secondary.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_both_failing_reports_both_errors() {
        let (fetcher, _, _) = fallback_with(None, None);
        let err = fetcher.fetch("https://a/", &FetchOptions::new()).await.unwrap_err();
        match err {
            SearchError::Fallback { primary, fallback } => {
                assert!(matches!(*primary, SearchError::HttpStatus { status: 503, .. }));
                assert!(matches!(*fallback, SearchError::HttpStatus { status: 503, .. }));
            }
            other => panic!("expected Fallback, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fallback_build_failure_is_reported() {
        let primary = Arc::new(Counters::default());
        let fetcher = FallbackFetcher::new(
            Box::new(StubFetcher {
                html: None,
                counters: Arc::clone(&primary),
            }),
            || Err(SearchError::Configuration("no browser".to_string())),
        );
        let err = fetcher.fetch("https://a/", &FetchOptions::new()).await.unwrap_err();
        match err {
            SearchError::Fallback { fallback, .. } => {
                assert!(matches!(*fallback, SearchError::Configuration(_)))
            }
            other => panic!("expected Fallback, got {other:?}"),
        }
    }
}

//! Browser-backed page fetching with bot-challenge retries.
//!
//! [`BrowserFetcher`] drives a [`RenderSession`] through a bounded attempt
//! loop: render, check the content for a challenge page, and on detection
//! back off, reset the session, and try again. The Chrome-backed session is
//! only available with the `headless` Cargo feature.

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::challenge::{self, ChallengePolicy};
use crate::fetcher::{FetchOptions, PageFetcher};
use crate::{Result, SearchError};

/// A browser session able to render one URL at a time.
#[async_trait]
pub trait RenderSession: Send + Sync {
    /// Navigates to `url`, performs any interaction, and returns the final HTML.
    async fn render(&self, url: &str, options: &FetchOptions) -> Result<String>;

    /// Discards the current session so the next render starts fresh.
    async fn reset(&self) -> Result<()>;

    /// Shuts the session down.
    async fn close(&self) -> Result<()>;
}

/// A `PageFetcher` that renders pages in a browser session.
pub struct BrowserFetcher<S> {
    session: S,
    policy: ChallengePolicy,
}

impl<S: RenderSession> BrowserFetcher<S> {
    pub fn new(session: S, policy: ChallengePolicy) -> Self {
        Self { session, policy }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn policy(&self) -> ChallengePolicy {
        self.policy
    }
}

#[async_trait]
impl<S: RenderSession> PageFetcher for BrowserFetcher<S> {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<String> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(url, attempt, "Rendering page");

            let html = self.session.render(url, options).await?;

            let Some(indicator) = challenge::find_indicator(&html) else {
                info!(url, attempt, bytes = html.len(), "Browser fetch succeeded");
                return Ok(html);
            };

            if attempt >= max_attempts {
                error!(url, attempt, indicator, "Still blocked by bot challenge, giving up");
                return Err(SearchError::Blocked {
                    url: url.to_string(),
                    attempts: attempt,
                });
            }

            let delay = self.policy.backoff();
            warn!(
                url,
                attempt,
                indicator,
                "Bot challenge detected, retrying in {}ms with a fresh session",
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
            self.session.reset().await?;
        }
    }

    async fn close(&self) -> Result<()> {
        self.session.close().await
    }

    fn kind(&self) -> &'static str {
        "browser"
    }
}

#[cfg(feature = "headless")]
pub use chrome::{ChromeFetcher, ChromeSession};

#[cfg(feature = "headless")]
mod chrome {
    use std::collections::HashMap;
    use std::time::Duration;

    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::cdp::browser_protocol::network::{
        Headers, SetExtraHttpHeadersParams, SetUserAgentOverrideParams,
    };
    use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
    use chromiumoxide::layout::Point;
    use chromiumoxide::Page;
    use futures::StreamExt;
    use rand::rngs::StdRng;
    use rand::seq::IndexedRandom;
    use rand::{Rng, SeedableRng};
    use tokio::sync::Mutex;
    use tokio::task::JoinHandle;
    use tracing::{debug, info, warn};

    use super::{BrowserFetcher, RenderSession};
    use crate::challenge::ChallengePolicy;
    use crate::config::{BrowserSettings, USER_AGENTS};
    use crate::fetcher::{FetchOptions, Interaction, WaitStrategy};
    use crate::{browser_setup, human, Result, SearchError};

    /// Chrome-backed fetcher with challenge retries.
    pub type ChromeFetcher = BrowserFetcher<ChromeSession>;

    impl ChromeFetcher {
        /// Builds a fetcher whose retry policy comes from `settings`.
        pub fn from_settings(settings: BrowserSettings) -> Self {
            let policy = ChallengePolicy::new(
                settings.max_challenge_retries,
                Duration::from_millis(settings.retry_delay_ms),
            );
            BrowserFetcher::new(ChromeSession::new(settings), policy)
        }
    }

    struct RunningBrowser {
        browser: Browser,
        handler: JoinHandle<()>,
    }

    /// A lazily launched Chrome process owned by one fetcher.
    pub struct ChromeSession {
        settings: BrowserSettings,
        running: Mutex<Option<RunningBrowser>>,
        user_agent: Mutex<String>,
    }

    impl ChromeSession {
        pub fn new(settings: BrowserSettings) -> Self {
            let user_agent = settings
                .user_agent
                .clone()
                .unwrap_or_else(|| pick_user_agent(None));
            Self {
                settings,
                running: Mutex::new(None),
                user_agent: Mutex::new(user_agent),
            }
        }

        pub fn settings(&self) -> &BrowserSettings {
            &self.settings
        }

        pub async fn user_agent(&self) -> String {
            self.user_agent.lock().await.clone()
        }

        async fn launch(&self) -> Result<RunningBrowser> {
            debug!(headless = self.settings.headless, "Launching browser");

            let mut builder = BrowserConfig::builder().window_size(
                human::VIEWPORT.0 as u32,
                human::VIEWPORT.1 as u32,
            );

            if self.settings.headless {
                builder = builder.arg("--headless=new");
            } else {
                builder = builder.with_head();
            }

            let chrome_path = browser_setup::resolve_chrome(self.settings.executable_path.as_deref())?;
            debug!("Using Chrome at: {}", chrome_path.display());
            builder = builder.chrome_executable(chrome_path);

            // Headless Chrome advertises itself in the default UA.
            builder = builder.arg(format!("--user-agent={}", self.user_agent().await));

            builder = builder
                .arg("--disable-blink-features=AutomationControlled")
                .arg("--disable-gpu")
                .arg("--no-sandbox")
                .arg("--disable-dev-shm-usage")
                .arg("--disable-extensions")
                .arg("--disable-background-networking")
                .arg("--disable-default-apps")
                .arg("--disable-sync")
                .arg("--disable-translate")
                .arg("--mute-audio")
                .arg("--no-first-run");

            for arg in &self.settings.args {
                builder = builder.arg(arg);
            }

            let config = builder
                .build()
                .map_err(|e| SearchError::Browser(format!("Failed to build browser config: {}", e)))?;

            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| SearchError::Browser(format!("Failed to launch browser: {}", e)))?;

            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(e) = event {
                        debug!("Browser CDP handler error: {}", e);
                    }
                }
                debug!("Browser CDP handler exited");
            });

            info!("Browser launched");
            Ok(RunningBrowser { browser, handler })
        }

        async fn shutdown(&self) -> Result<()> {
            let Some(mut running) = self.running.lock().await.take() else {
                return Ok(());
            };

            let closed = running
                .browser
                .close()
                .await
                .map(|_| ())
                .map_err(|e| SearchError::Browser(format!("Failed to close browser: {}", e)));
            if let Err(e) = running.browser.wait().await {
                warn!("Failed waiting for browser process to exit: {}", e);
            }
            running.handler.abort();
            debug!("Browser shut down");
            closed
        }

        async fn drive(&self, page: &Page, url: &str, options: &FetchOptions) -> Result<String> {
            let timeout = Duration::from_millis(options.timeout_ms.unwrap_or(self.settings.timeout_ms));

            let user_agent = match &options.user_agent {
                Some(ua) => ua.clone(),
                None => self.user_agent().await,
            };
            page.set_user_agent(SetUserAgentOverrideParams::new(user_agent))
                .await
                .map_err(|e| SearchError::Browser(format!("Failed to set user agent: {}", e)))?;

            let headers = merge_headers(&self.settings.default_headers, &options.extra_headers);
            if !headers.is_empty() {
                page.execute(SetExtraHttpHeadersParams::new(Headers::new(
                    serde_json::to_value(&headers)?,
                )))
                .await
                .map_err(|e| SearchError::Browser(format!("Failed to set headers: {}", e)))?;
            }

            let mut navigate = NavigateParams::builder().url(url);
            if let Some(referer) = &options.referer {
                navigate = navigate.referrer(referer.clone());
            }
            let navigate = navigate
                .build()
                .map_err(|e| SearchError::Browser(format!("Invalid navigation: {}", e)))?;

            match tokio::time::timeout(timeout, page.goto(navigate)).await {
                Err(_) => return Err(SearchError::Timeout(url.to_string())),
                Ok(Err(e)) => return Err(navigation_error(url, &e.to_string())),
                Ok(Ok(_)) => {}
            }

            let wait = options.wait.as_ref().unwrap_or(&self.settings.wait);
            apply_wait(page, wait, timeout).await?;

            if let Some(plan) = &options.interaction {
                interact(page, plan, timeout).await?;
            }

            page.content()
                .await
                .map_err(|e| SearchError::Browser(format!("Failed to get page content: {}", e)))
        }
    }

    #[async_trait]
    impl RenderSession for ChromeSession {
        async fn render(&self, url: &str, options: &FetchOptions) -> Result<String> {
            let page = {
                let mut running = self.running.lock().await;
                if running.is_none() {
                    *running = Some(self.launch().await?);
                }
                let Some(active) = running.as_ref() else {
                    return Err(SearchError::Browser("Browser is not running".to_string()));
                };
                active
                    .browser
                    .new_page("about:blank")
                    .await
                    .map_err(|e| SearchError::Browser(format!("Failed to open tab: {}", e)))?
            };

            let result = self.drive(&page, url, options).await;

            if let Err(e) = page.close().await {
                warn!("Failed to close browser tab: {}", e);
            }
            result
        }

        async fn reset(&self) -> Result<()> {
            if self.settings.user_agent.is_none() {
                let mut ua = self.user_agent.lock().await;
                *ua = pick_user_agent(Some(ua.as_str()));
            }
            if let Err(e) = self.shutdown().await {
                warn!("Failed to close browser during reset: {}", e);
            }
            Ok(())
        }

        async fn close(&self) -> Result<()> {
            self.shutdown().await
        }
    }

    fn pick_user_agent(current: Option<&str>) -> String {
        let candidates: Vec<&str> = USER_AGENTS
            .iter()
            .copied()
            .filter(|ua| Some(*ua) != current)
            .collect();
        let pool = if candidates.is_empty() { USER_AGENTS.to_vec() } else { candidates };
        pool.choose(&mut rand::rng())
            .map(|ua| ua.to_string())
            .unwrap_or_default()
    }

    fn merge_headers(
        defaults: &HashMap<String, String>,
        extra: &HashMap<String, String>,
    ) -> HashMap<String, String> {
        let mut merged = defaults.clone();
        merged.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    fn navigation_error(url: &str, message: &str) -> SearchError {
        if message.contains("ERR_NAME_NOT_RESOLVED") {
            SearchError::NameResolution(url.to_string())
        } else if message.contains("ERR_TIMED_OUT") {
            SearchError::Timeout(url.to_string())
        } else {
            SearchError::Browser(format!("Navigation to {} failed: {}", url, message))
        }
    }

    async fn apply_wait(page: &Page, wait: &WaitStrategy, timeout: Duration) -> Result<()> {
        match wait {
            WaitStrategy::Load => {
                wait_for_navigation(page, timeout).await?;
            }
            WaitStrategy::NetworkIdle { idle_ms } => {
                wait_for_navigation(page, timeout).await?;
                tokio::time::sleep(Duration::from_millis(*idle_ms)).await;
            }
            WaitStrategy::Selector { css, timeout_ms } => {
                // A challenge page may never show the selector; the caller checks content.
                let found = tokio::time::timeout(Duration::from_millis(*timeout_ms), async {
                    page.find_element(css.as_str()).await
                })
                .await;
                if let Err(_) | Ok(Err(_)) = found {
                    debug!(
                        "Selector '{}' not found within {}ms, proceeding with current page content",
                        css, timeout_ms
                    );
                }
            }
            WaitStrategy::Delay { ms } => {
                wait_for_navigation(page, timeout).await?;
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
        }
        Ok(())
    }

    async fn wait_for_navigation(page: &Page, timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, page.wait_for_navigation()).await {
            Err(_) => Err(SearchError::Timeout("waiting for page load".to_string())),
            Ok(Err(e)) => Err(SearchError::Browser(format!("Navigation wait failed: {}", e))),
            Ok(Ok(_)) => Ok(()),
        }
    }

    /// Types the query into the search box the way a person would.
    async fn interact(page: &Page, plan: &Interaction, timeout: Duration) -> Result<()> {
        let mut rng = StdRng::from_os_rng();

        for selector in &plan.consent_selectors {
            if let Ok(button) = page.find_element(selector.as_str()).await {
                match button.click().await {
                    Ok(_) => {
                        debug!("Dismissed consent dialog via '{}'", selector);
                        tokio::time::sleep(human::think_pause(&mut rng)).await;
                        break;
                    }
                    Err(e) => debug!("Consent button '{}' not clickable: {}", selector, e),
                }
            }
        }

        let input = tokio::time::timeout(timeout, page.find_element(plan.input_selector.as_str()))
            .await
            .map_err(|_| SearchError::Timeout("waiting for search input".to_string()))?
            .map_err(|e| SearchError::Browser(format!("Search input not found: {}", e)))?;

        let target = input
            .clickable_point()
            .await
            .map_err(|e| SearchError::Browser(format!("Search input not visible: {}", e)))?;
        let start = (
            human::VIEWPORT.0 / 2.0 + rng.random_range(-200.0..200.0),
            human::VIEWPORT.1 / 2.0 + rng.random_range(-150.0..150.0),
        );
        for step in human::pointer_path(start, (target.x, target.y), &mut rng) {
            if let Err(e) = page.move_mouse(Point::new(step.x, step.y)).await {
                debug!("Pointer move failed: {}", e);
                break;
            }
            tokio::time::sleep(step.pause).await;
        }

        input
            .click()
            .await
            .map_err(|e| SearchError::Browser(format!("Failed to focus search input: {}", e)))?;
        tokio::time::sleep(human::think_pause(&mut rng)).await;

        let delays = human::keystroke_delays(&plan.query, &mut rng);
        for (ch, delay) in plan.query.chars().zip(delays) {
            input
                .type_str(ch.to_string())
                .await
                .map_err(|e| SearchError::Browser(format!("Typing failed: {}", e)))?;
            tokio::time::sleep(delay).await;
        }

        tokio::time::sleep(human::think_pause(&mut rng)).await;
        input
            .press_key("Enter")
            .await
            .map_err(|e| SearchError::Browser(format!("Submitting search failed: {}", e)))?;

        let results =
            tokio::time::timeout(timeout, page.find_element(plan.results_selector.as_str())).await;
        if let Err(_) | Ok(Err(_)) = results {
            debug!(
                "Results marker '{}' did not appear, checking current content",
                plan.results_selector
            );
        }

        for round in human::scroll_plan(&mut rng) {
            let script = format!("window.scrollBy(0, {})", round.dy);
            if let Err(e) = page.evaluate(script.as_str()).await {
                debug!("Scroll failed: {}", e);
            }
            if let Err(e) = page.move_mouse(Point::new(round.pointer.0, round.pointer.1)).await {
                debug!("Pointer move failed: {}", e);
            }
            tokio::time::sleep(round.pause).await;
        }

        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_navigation_error_classification() {
            assert!(matches!(
                navigation_error("https://x.invalid/", "net::ERR_NAME_NOT_RESOLVED"),
                SearchError::NameResolution(_)
            ));
            assert!(matches!(
                navigation_error("https://x/", "net::ERR_TIMED_OUT"),
                SearchError::Timeout(_)
            ));
            assert!(matches!(
                navigation_error("https://x/", "net::ERR_CONNECTION_REFUSED"),
                SearchError::Browser(_)
            ));
        }

        #[test]
        fn test_pick_user_agent_rotates() {
            let current = USER_AGENTS[0];
            for _ in 0..20 {
                assert_ne!(pick_user_agent(Some(current)), current);
            }
        }

        #[test]
        fn test_merge_headers_extra_wins() {
            let defaults = HashMap::from([
                ("Accept-Language".to_string(), "ko-KR".to_string()),
                ("X-A".to_string(), "1".to_string()),
            ]);
            let extra = HashMap::from([("X-A".to_string(), "2".to_string())]);
            let merged = merge_headers(&defaults, &extra);
            assert_eq!(merged["X-A"], "2");
            assert_eq!(merged["Accept-Language"], "ko-KR");
        }

        #[tokio::test]
        async fn test_session_configured_user_agent_survives_reset() {
            let session = ChromeSession::new(BrowserSettings {
                user_agent: Some("TestBot/1.0".to_string()),
                ..Default::default()
            });
            session.reset().await.unwrap();
            assert_eq!(session.user_agent().await, "TestBot/1.0");
        }

        #[tokio::test]
        async fn test_close_without_launch() {
            let fetcher = ChromeFetcher::from_settings(BrowserSettings::default());
            assert_eq!(fetcher.policy().max_retries, 2);
            fetcher.session().close().await.unwrap();
            fetcher.session().close().await.unwrap();
        }
    }
}

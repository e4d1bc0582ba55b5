//! Page fetcher abstraction for retrieving HTML content.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Strategy for waiting until a page is considered fully loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WaitStrategy {
    /// Wait for the page load event only.
    #[default]
    Load,
    /// Wait until network activity settles for the given duration.
    NetworkIdle {
        /// Milliseconds of network inactivity to wait for.
        idle_ms: u64,
    },
    /// Wait until a CSS selector matches an element on the page.
    Selector {
        /// CSS selector to wait for.
        css: String,
        /// Maximum time to wait in milliseconds before proceeding anyway.
        timeout_ms: u64,
    },
    /// Wait a fixed delay after the page load event.
    Delay {
        /// Milliseconds to wait after page load.
        ms: u64,
    },
}

/// Human-like interaction performed after the initial navigation.
///
/// The fetcher types `query` into the element matched by `input_selector`,
/// submits, and waits for `results_selector` before scrolling around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    pub query: String,
    pub input_selector: String,
    pub results_selector: String,
    pub consent_selectors: Vec<String>,
}

impl Interaction {
    /// Interaction plan for Google's home page.
    pub fn google(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            input_selector: "textarea[name='q'], input[name='q']".to_string(),
            results_selector: "#search".to_string(),
            consent_selectors: vec![
                "#L2AGLb".to_string(),
                "button[aria-label='Accept all']".to_string(),
                "button[aria-label='모두 수락']".to_string(),
            ],
        }
    }
}

/// Per-request fetch options. Unset fields fall back to fetcher defaults.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub extra_headers: HashMap<String, String>,
    pub wait: Option<WaitStrategy>,
    pub timeout_ms: Option<u64>,
    pub interaction: Option<Interaction>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(name.into(), value.into());
        self
    }

    pub fn with_wait(mut self, wait: WaitStrategy) -> Self {
        self.wait = Some(wait);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_interaction(mut self, interaction: Interaction) -> Self {
        self.interaction = Some(interaction);
        self
    }
}

/// Trait for fetching the full HTML content of a URL.
///
/// Implementations may use plain HTTP requests or a headless browser. An
/// instance owns its session exclusively; callers must `close` it once done.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the HTML content of the given URL.
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<String>;

    /// Releases any session held by this fetcher.
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Short label used in logs.
    fn kind(&self) -> &'static str;
}

//! Typed configuration for crawlers and the search service.
//!
//! Values come from defaults, an optional JSON file, and finally environment
//! variables. Unparseable environment values are ignored with a warning.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::fetcher::WaitStrategy;
use crate::Result;

/// Desktop Chrome user agents rotated across sessions.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
];

pub const DEFAULT_ACCEPT_LANGUAGE: &str = "ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7";

/// Settings for the headless browser strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Run Chrome without a window.
    pub headless: bool,
    /// Extra launch arguments appended to the built-in set.
    pub args: Vec<String>,
    /// Fixed user agent. `None` picks one from [`USER_AGENTS`] per session.
    pub user_agent: Option<String>,
    /// Headers sent with every navigation.
    pub default_headers: HashMap<String, String>,
    /// How to decide a page has finished loading.
    pub wait: WaitStrategy,
    /// Navigation deadline in milliseconds.
    pub timeout_ms: u64,
    /// Chrome executable. `None` auto-detects.
    pub executable_path: Option<PathBuf>,
    /// Base delay; challenge backoff is 5–10x this.
    pub retry_delay_ms: u64,
    /// Retries after a challenge page before giving up.
    pub max_challenge_retries: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        let mut default_headers = HashMap::new();
        default_headers.insert(
            "Accept-Language".to_string(),
            DEFAULT_ACCEPT_LANGUAGE.to_string(),
        );
        Self {
            headless: true,
            args: Vec::new(),
            user_agent: None,
            default_headers,
            wait: WaitStrategy::NetworkIdle { idle_ms: 500 },
            timeout_ms: 30_000,
            executable_path: None,
            retry_delay_ms: 1_000,
            max_challenge_retries: 2,
        }
    }
}

/// Settings for the plain HTTP strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Per-request deadline in milliseconds.
    pub timeout_ms: u64,
    /// Total number of attempts per fetch.
    pub max_retries: u32,
    /// Delay unit; attempt `n` waits `n * retry_delay_ms` before the next one.
    pub retry_delay_ms: u64,
    /// Fixed user agent. `None` picks one from [`USER_AGENTS`].
    pub user_agent: Option<String>,
    pub accept_language: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            max_retries: 3,
            retry_delay_ms: 1_000,
            user_agent: None,
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
        }
    }
}

/// Which fetch strategy to build, plus the settings for each.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// `"http"`, `"browser"` or `"fallback"`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub browser: Option<BrowserSettings>,
    #[serde(default)]
    pub http: Option<HttpSettings>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            kind: "fallback".to_string(),
            browser: Some(BrowserSettings::default()),
            http: Some(HttpSettings::default()),
        }
    }
}

impl CrawlerConfig {
    pub fn http(settings: HttpSettings) -> Self {
        Self {
            kind: "http".to_string(),
            browser: None,
            http: Some(settings),
        }
    }

    pub fn browser(settings: BrowserSettings) -> Self {
        Self {
            kind: "browser".to_string(),
            browser: Some(settings),
            http: None,
        }
    }
}

/// Service-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Engine descriptor file. `None` uses the built-in list.
    pub engines_path: Option<PathBuf>,
    /// Engine reserved for the dedicated human-like browser path.
    pub protected_engine: String,
    pub crawler: CrawlerConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            engines_path: None,
            protected_engine: "Google".to_string(),
            crawler: CrawlerConfig::default(),
        }
    }
}

impl SearchConfig {
    /// Reads a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Defaults, then `path` if given, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies overrides from a variable lookup (normally the process env).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("SEARCH_ENGINES_CONFIG") {
            self.engines_path = Some(PathBuf::from(path));
        }
        if let Some(kind) = lookup("SEARCH_CRAWLER_TYPE") {
            self.crawler.kind = kind;
        }

        let headless = parse_env::<bool>(&lookup, "SEARCH_HEADLESS");
        let timeout_ms = parse_env::<u64>(&lookup, "SEARCH_TIMEOUT_MS");
        let max_retries = parse_env::<u32>(&lookup, "SEARCH_MAX_RETRIES");
        let retry_delay_ms = parse_env::<u64>(&lookup, "SEARCH_RETRY_DELAY_MS");
        let user_agent = lookup("SEARCH_USER_AGENT");
        let chrome = lookup("CHROME_PATH").or_else(|| lookup("CHROME"));

        if let Some(browser) = self.crawler.browser.as_mut() {
            if let Some(headless) = headless {
                browser.headless = headless;
            }
            if let Some(timeout_ms) = timeout_ms {
                browser.timeout_ms = timeout_ms;
            }
            if let Some(delay) = retry_delay_ms {
                browser.retry_delay_ms = delay;
            }
            if let Some(ua) = &user_agent {
                browser.user_agent = Some(ua.clone());
            }
            if let Some(path) = &chrome {
                browser.executable_path = Some(PathBuf::from(path));
            }
        }

        if let Some(http) = self.crawler.http.as_mut() {
            if let Some(timeout_ms) = timeout_ms {
                http.timeout_ms = timeout_ms;
            }
            if let Some(max_retries) = max_retries {
                http.max_retries = max_retries;
            }
            if let Some(delay) = retry_delay_ms {
                http.retry_delay_ms = delay;
            }
            if let Some(ua) = user_agent {
                http.user_agent = Some(ua);
            }
        }
    }
}

fn parse_env<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid value for {}: '{}'", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.protected_engine, "Google");
        assert_eq!(config.crawler.kind, "fallback");
        let http = config.crawler.http.unwrap();
        assert_eq!(http.max_retries, 3);
        assert_eq!(http.retry_delay_ms, 1_000);
        let browser = config.crawler.browser.unwrap();
        assert!(browser.headless);
        assert_eq!(browser.max_challenge_retries, 2);
        assert_eq!(browser.timeout_ms, 30_000);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SearchConfig::default();
        config.apply_env(env(&[
            ("SEARCH_CRAWLER_TYPE", "http"),
            ("SEARCH_HEADLESS", "false"),
            ("SEARCH_TIMEOUT_MS", "5000"),
            ("SEARCH_MAX_RETRIES", "5"),
            ("CHROME", "/opt/chrome/chrome"),
            ("SEARCH_ENGINES_CONFIG", "/etc/engines.json"),
        ]));
        assert_eq!(config.crawler.kind, "http");
        assert_eq!(config.engines_path, Some(PathBuf::from("/etc/engines.json")));
        let browser = config.crawler.browser.as_ref().unwrap();
        assert!(!browser.headless);
        assert_eq!(browser.timeout_ms, 5000);
        assert_eq!(
            browser.executable_path.as_deref(),
            Some(Path::new("/opt/chrome/chrome"))
        );
        let http = config.crawler.http.as_ref().unwrap();
        assert_eq!(http.timeout_ms, 5000);
        assert_eq!(http.max_retries, 5);
    }

    #[test]
    fn test_chrome_path_wins_over_chrome() {
        let mut config = SearchConfig::default();
        config.apply_env(env(&[("CHROME_PATH", "/a"), ("CHROME", "/b")]));
        let browser = config.crawler.browser.unwrap();
        assert_eq!(browser.executable_path, Some(PathBuf::from("/a")));
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let mut config = SearchConfig::default();
        config.apply_env(env(&[("SEARCH_HEADLESS", "maybe"), ("SEARCH_MAX_RETRIES", "-1")]));
        assert!(config.crawler.browser.as_ref().unwrap().headless);
        assert_eq!(config.crawler.http.as_ref().unwrap().max_retries, 3);
    }

    #[test]
    fn test_crawler_config_deserialization() {
        let json = r#"{"type":"http","http":{"max_retries":2}}"#;
        let config: CrawlerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.kind, "http");
        assert!(config.browser.is_none());
        let http = config.http.unwrap();
        assert_eq!(http.max_retries, 2);
        assert_eq!(http.timeout_ms, 15_000);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"protected_engine":"google","crawler":{{"type":"browser","browser":{{"headless":false}}}}}}"#
        )
        .unwrap();
        let config = SearchConfig::from_file(file.path()).unwrap();
        assert_eq!(config.protected_engine, "google");
        assert_eq!(config.crawler.kind, "browser");
        assert!(!config.crawler.browser.unwrap().headless);
        assert!(config.crawler.http.is_none());
    }
}

//! # search-crawler
//!
//! Multi-engine web search that returns readable result text.
//!
//! This library queries the result pages of several public search engines
//! and turns them into plain text, with support for:
//!
//! - Data-driven engine descriptors (name, URL template, languages)
//! - Plain HTTP fetching, headless browser fetching, or HTTP with browser fallback
//! - Bot-challenge detection with bounded, randomized retries
//! - Concurrent integrated search that reports per-engine failures
//! - A human-like interactive browser path for Google
//! - A JSON tool surface served over stdio
//!
//! ## Example
//!
//! ```rust,no_run
//! use search_crawler::{SearchConfig, SearchOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SearchConfig::load(None)?;
//!     let search = SearchOrchestrator::from_config(&config);
//!
//!     let results = search.run_integrated_search("exchange rate today", Some("en"), false).await?;
//!     for result in &results {
//!         match (&result.result_text, &result.error) {
//!             (Some(text), _) => println!("{}: {}", result.engine_name, text),
//!             (_, Some(error)) => println!("{} failed: {}", result.engine_name, error),
//!             _ => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod error;
mod query;
mod result;

pub mod browser;
#[cfg(feature = "headless")]
pub mod browser_setup;
pub mod challenge;
pub mod config;
pub mod crawler;
pub mod engine;
pub mod extract;
pub mod fetcher;
pub mod fetcher_http;
pub mod human;
pub mod registry;
pub mod search;
pub mod tools;
pub mod translate;

pub use browser::{BrowserFetcher, RenderSession};
#[cfg(feature = "headless")]
pub use browser::{ChromeFetcher, ChromeSession};
pub use challenge::{is_challenge_page, ChallengePolicy};
pub use config::{BrowserSettings, CrawlerConfig, HttpSettings, SearchConfig};
pub use crawler::{CrawlerSelector, FallbackFetcher, FetcherFactory};
pub use engine::{EngineDescriptor, EngineSource, FileEngineSource, StaticEngineSource};
pub use error::{Result, SearchError};
pub use fetcher::{FetchOptions, Interaction, PageFetcher, WaitStrategy};
pub use fetcher_http::PlainHttpFetcher;
pub use query::{validate_query, SearchQuery};
pub use registry::EngineRegistry;
pub use result::{SearchResult, UrlContent};
pub use search::SearchOrchestrator;
pub use tools::{ToolDefinition, ToolRegistry};
pub use translate::{IdentityTranslator, QueryTranslator};

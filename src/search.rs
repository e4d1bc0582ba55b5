//! Search orchestration.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::SearchConfig;
use crate::crawler::{CrawlerSelector, FetcherFactory};
use crate::engine::{EngineDescriptor, EngineSource, FileEngineSource, StaticEngineSource};
use crate::extract;
use crate::fetcher::{FetchOptions, Interaction, PageFetcher};
use crate::query::validate_query;
use crate::registry::{origin_of, EngineRegistry};
use crate::translate::QueryTranslator;
use crate::{Result, SearchError, SearchResult, UrlContent};

/// Engine name reserved for the interactive browser path by default.
pub const DEFAULT_PROTECTED_ENGINE: &str = "Google";

/// Home page used when the protected engine has no descriptor.
pub const DEFAULT_PROTECTED_HOME: &str = "https://www.google.com/";

/// Runs single-engine, integrated, and protected-engine searches.
///
/// Each search gets its own fetcher from the factory and closes it before
/// returning, whatever the outcome.
pub struct SearchOrchestrator {
    registry: Arc<EngineRegistry>,
    crawlers: Arc<dyn FetcherFactory>,
    protected_engine: String,
    translator: Option<Arc<dyn QueryTranslator>>,
}

impl SearchOrchestrator {
    pub fn new(registry: Arc<EngineRegistry>, crawlers: Arc<dyn FetcherFactory>) -> Self {
        Self {
            registry,
            crawlers,
            protected_engine: DEFAULT_PROTECTED_ENGINE.to_string(),
            translator: None,
        }
    }

    /// Builds the registry and crawler selector described by `config`.
    pub fn from_config(config: &SearchConfig) -> Self {
        let source: Box<dyn EngineSource> = match &config.engines_path {
            Some(path) => Box::new(FileEngineSource::new(path)),
            None => Box::new(StaticEngineSource::builtin()),
        };
        let registry = EngineRegistry::load_from(source.as_ref());
        Self::new(
            Arc::new(registry),
            Arc::new(CrawlerSelector::new(config.crawler.clone())),
        )
        .with_protected_engine(config.protected_engine.clone())
    }

    /// Sets the engine excluded from integrated search.
    pub fn with_protected_engine(mut self, name: impl Into<String>) -> Self {
        self.protected_engine = name.into();
        self
    }

    pub fn with_translator(mut self, translator: Arc<dyn QueryTranslator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    pub fn protected_engine(&self) -> &str {
        &self.protected_engine
    }

    /// Searches one engine and returns its cleaned result page.
    pub async fn run_single_engine_search(
        &self,
        query: &str,
        engine_name: &str,
        language_code: Option<&str>,
        keep_markup: bool,
    ) -> Result<SearchResult> {
        validate_query(query)?;

        let engine = self
            .registry
            .by_name(engine_name)
            .ok_or_else(|| SearchError::EngineNotFound(engine_name.to_string()))?;

        let effective_query = self.translate_for(engine, query).await;
        let url = EngineRegistry::build_query_url(engine, &effective_query, language_code);
        debug!(engine = %engine.name, url = %url, "Searching");

        let mut options = FetchOptions::new();
        if let Some(referer) = EngineRegistry::referer_for(engine) {
            options = options.with_referer(referer);
        }

        let html = match self.fetch_with(self.crawlers.create()?, &url, &options).await {
            Ok(html) => html,
            Err(e) => {
                error!(engine = %engine.name, url = %url, query, "Search failed: {}", e);
                return Err(e);
            }
        };

        let text = extract::clean(&html, keep_markup);
        info!(engine = %engine.name, chars = text.len(), "Search completed");

        Ok(SearchResult::success(
            &effective_query,
            &engine.name,
            language_code.map(str::to_string),
            url,
            text,
        ))
    }

    /// Searches every eligible engine concurrently.
    ///
    /// Eligible engines are those supporting `language_code` (all engines if
    /// none do, or if no code is given), minus the protected engine. Engine
    /// failures become entries with `error` set; results keep engine order.
    pub async fn run_integrated_search(
        &self,
        query: &str,
        language_code: Option<&str>,
        keep_markup: bool,
    ) -> Result<Vec<SearchResult>> {
        validate_query(query)?;

        let mut candidates: Vec<&EngineDescriptor> = match language_code {
            Some(code) => {
                let matching = self.registry.by_language(code);
                if matching.is_empty() {
                    warn!(
                        language = code,
                        "No engine supports this language, falling back to all engines"
                    );
                    self.registry.all().iter().collect()
                } else {
                    matching
                }
            }
            None => self.registry.all().iter().collect(),
        };
        candidates.retain(|engine| !engine.matches_name(&self.protected_engine));

        if candidates.is_empty() {
            info!("No engines eligible for integrated search");
            return Ok(Vec::new());
        }
        debug!("Searching {} engines", candidates.len());

        let searches = candidates.iter().map(|engine| async move {
            match self
                .run_single_engine_search(query, &engine.name, language_code, keep_markup)
                .await
            {
                Ok(result) => result,
                Err(e) => {
                    warn!(engine = %engine.name, "Engine failed: {}", e);
                    SearchResult::failure(
                        query,
                        &engine.name,
                        language_code.map(str::to_string),
                        e.to_string(),
                    )
                }
            }
        });

        Ok(join_all(searches).await)
    }

    /// Searches the protected engine through the interactive browser path.
    pub async fn run_dedicated_protected_engine_search(
        &self,
        query: &str,
        keep_markup: bool,
    ) -> Result<SearchResult> {
        validate_query(query)?;

        let descriptor = self.registry.by_name(&self.protected_engine);
        let engine_name = descriptor
            .map(|e| e.name.clone())
            .unwrap_or_else(|| self.protected_engine.clone());
        let home = descriptor
            .and_then(|e| origin_of(&e.base_url))
            .unwrap_or_else(|| DEFAULT_PROTECTED_HOME.to_string());

        let options = FetchOptions::new().with_interaction(Interaction::google(query));
        let fetcher = self.crawlers.create_protected()?;

        let html = match self.fetch_with(fetcher, &home, &options).await {
            Ok(html) => html,
            Err(e) => {
                error!(engine = %engine_name, url = %home, query, "Protected search failed: {}", e);
                return Err(e);
            }
        };

        Ok(SearchResult::success(
            query,
            engine_name,
            None,
            home,
            extract::clean(&html, keep_markup),
        ))
    }

    /// Fetches an arbitrary http(s) URL and returns its cleaned text.
    pub async fn fetch_url(&self, url: &str) -> Result<UrlContent> {
        let parsed = Url::parse(url.trim())
            .map_err(|e| SearchError::InvalidUrl(format!("{}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SearchError::InvalidUrl(format!(
                "{}: only http and https are supported",
                url
            )));
        }

        let html = self
            .fetch_with(self.crawlers.create()?, parsed.as_str(), &FetchOptions::new())
            .await
            .inspect_err(|e| error!(url = %parsed, "URL fetch failed: {}", e))?;

        Ok(UrlContent::new(parsed.as_str(), extract::clean(&html, false)))
    }

    async fn translate_for(&self, engine: &EngineDescriptor, query: &str) -> String {
        let (Some(translator), Some(target)) = (&self.translator, &engine.query_language) else {
            return query.to_string();
        };
        match translator.translate(query, target).await {
            Ok(translated) => {
                debug!(engine = %engine.name, target = %target, "Translated query");
                translated
            }
            Err(e) => {
                warn!(engine = %engine.name, "Translation failed, using original query: {}", e);
                query.to_string()
            }
        }
    }

    /// Fetches `url` and closes the fetcher on every path.
    async fn fetch_with(
        &self,
        fetcher: Box<dyn PageFetcher>,
        url: &str,
        options: &FetchOptions,
    ) -> Result<String> {
        let result = fetcher.fetch(url, options).await;
        if let Err(e) = fetcher.close().await {
            warn!(kind = fetcher.kind(), "Failed to close fetcher: {}", e);
        }
        result
    }
}

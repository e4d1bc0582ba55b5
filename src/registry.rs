//! Read-only registry of engine descriptors.

use tracing::{debug, error, info};
use url::Url;

use crate::engine::{EngineDescriptor, EngineSource};

/// Engine descriptors loaded once at startup.
///
/// A missing or corrupt source leaves the registry empty; lookups then
/// simply find nothing.
#[derive(Debug, Clone, Default)]
pub struct EngineRegistry {
    engines: Vec<EngineDescriptor>,
}

impl EngineRegistry {
    /// Creates a registry from an already-loaded descriptor list.
    ///
    /// A descriptor whose name repeats an earlier one replaces it in place.
    pub fn new(descriptors: Vec<EngineDescriptor>) -> Self {
        let mut engines: Vec<EngineDescriptor> = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            if let Some(existing) = engines
                .iter_mut()
                .find(|e| e.matches_name(&descriptor.name))
            {
                debug!("Engine '{}' redefined, later entry wins", descriptor.name);
                *existing = descriptor;
            } else {
                engines.push(descriptor);
            }
        }
        Self { engines }
    }

    /// Loads descriptors from `source`, degrading to an empty registry on error.
    pub fn load_from(source: &dyn EngineSource) -> Self {
        match source.load() {
            Ok(descriptors) => {
                let registry = Self::new(descriptors);
                info!(
                    "Loaded {} search engines from {}",
                    registry.len(),
                    source.describe()
                );
                registry
            }
            Err(e) => {
                error!(
                    "Failed to load search engines from {}: {}. Continuing with no engines",
                    source.describe(),
                    e
                );
                Self::default()
            }
        }
    }

    /// All engines in configuration order.
    pub fn all(&self) -> &[EngineDescriptor] {
        &self.engines
    }

    /// Case-insensitive lookup by name.
    pub fn by_name(&self, name: &str) -> Option<&EngineDescriptor> {
        self.engines.iter().find(|e| e.matches_name(name))
    }

    /// Engines that list `code` among their supported languages.
    pub fn by_language(&self, code: &str) -> Vec<&EngineDescriptor> {
        self.engines
            .iter()
            .filter(|e| e.supports_language(code))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Builds the search URL for `query` on `engine`.
    ///
    /// The language parameter is only added when the engine declares one and
    /// supports `language_code`.
    pub fn build_query_url(
        engine: &EngineDescriptor,
        query: &str,
        language_code: Option<&str>,
    ) -> String {
        let mut params = vec![(engine.query_param.as_str(), query)];
        if let (Some(lang_param), Some(code)) = (engine.lang_param.as_deref(), language_code) {
            if engine.supports_language(code) {
                params.push((lang_param, code));
            }
        }

        let encoded = params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let base = engine.base_url.as_str();
        let separator = if !base.contains('?') {
            "?"
        } else if base.ends_with('?') || base.ends_with('&') {
            ""
        } else {
            "&"
        };
        format!("{base}{separator}{encoded}")
    }

    /// Referer for requests to `engine`: the configured one, else the base URL origin.
    pub fn referer_for(engine: &EngineDescriptor) -> Option<String> {
        if let Some(referer) = &engine.referer {
            return Some(referer.clone());
        }
        origin_of(&engine.base_url)
    }
}

/// Scheme and host of `url` with a trailing slash, e.g. `https://www.bing.com/`.
pub fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{}://{}:{}/", parsed.scheme(), host, port),
        None => format!("{}://{}/", parsed.scheme(), host),
    })
}

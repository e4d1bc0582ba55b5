//! Search request representation.

use serde::{Deserialize, Serialize};

use crate::{Result, SearchError};

/// A search request as accepted by the orchestrator and the tool surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// The search terms.
    pub query: String,
    /// Target engine. `None` means every eligible engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_name: Option<String>,
    /// Language filter / engine language hint (e.g. "ko").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    /// Return raw markup instead of cleaned text.
    #[serde(default, alias = "includeHtml")]
    pub keep_markup: bool,
}

impl SearchQuery {
    /// Creates a new search query with the given terms.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            engine_name: None,
            language_code: None,
            keep_markup: false,
        }
    }

    /// Sets the target engine.
    pub fn with_engine(mut self, engine_name: impl Into<String>) -> Self {
        self.engine_name = Some(engine_name.into());
        self
    }

    /// Sets the language code.
    pub fn with_language(mut self, language_code: impl Into<String>) -> Self {
        self.language_code = Some(language_code.into());
        self
    }

    pub fn with_keep_markup(mut self, keep_markup: bool) -> Self {
        self.keep_markup = keep_markup;
        self
    }

    /// Rejects blank queries.
    pub fn validate(&self) -> Result<()> {
        validate_query(&self.query)
    }
}

/// Rejects a query that is empty after trimming.
pub fn validate_query(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(SearchError::InvalidQuery(
            "query must not be empty".to_string(),
        ));
    }
    Ok(())
}

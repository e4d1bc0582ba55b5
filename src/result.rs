//! Search result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one engine search.
///
/// Exactly one of `result_text` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// The query as executed, after any translation for the engine.
    pub query: String,
    pub engine_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    /// Cleaned text, or raw markup when markup was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_text: Option<String>,
    /// Failure message for entries of an integrated search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_url: Option<String>,
    pub retrieved_at: DateTime<Utc>,
}

impl SearchResult {
    /// Creates a successful result stamped with the current time.
    pub fn success(
        query: impl Into<String>,
        engine_name: impl Into<String>,
        language_code: Option<String>,
        search_url: impl Into<String>,
        result_text: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            engine_name: engine_name.into(),
            language_code,
            result_text: Some(result_text.into()),
            error: None,
            search_url: Some(search_url.into()),
            retrieved_at: Utc::now(),
        }
    }

    /// Creates a failed result stamped with the current time.
    pub fn failure(
        query: impl Into<String>,
        engine_name: impl Into<String>,
        language_code: Option<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            engine_name: engine_name.into(),
            language_code,
            result_text: None,
            error: Some(error.into()),
            search_url: None,
            retrieved_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Cleaned text of an arbitrary URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlContent {
    pub url: String,
    pub text_content: String,
    pub retrieved_at: DateTime<Utc>,
}

impl UrlContent {
    pub fn new(url: impl Into<String>, text_content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text_content: text_content.into(),
            retrieved_at: Utc::now(),
        }
    }
}

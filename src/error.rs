//! Error types for the search library.

use thiserror::Error;

/// Result type alias for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that can occur during search operations.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Invalid configuration (engine source, crawler type, missing sub-config).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No engine descriptor matches the requested name.
    #[error("Search engine '{0}' not found")]
    EngineNotFound(String),

    /// Invalid query.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Malformed or unsupported URL supplied by the caller.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Tool arguments did not match the tool's input schema.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// No tool is registered under the requested name.
    #[error("Unknown tool '{0}'")]
    UnknownTool(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("HTTP {status} received from {url}")]
    HttpStatus { status: u16, url: String },

    /// The target host name could not be resolved.
    #[error("Could not resolve host for URL: {0}")]
    NameResolution(String),

    /// Request or navigation exceeded its deadline.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Headless browser failure (launch, tab, CDP command).
    #[error("Browser error: {0}")]
    Browser(String),

    /// Bot-challenge page kept being served after all retries.
    #[error("Blocked by bot challenge at {url} after {attempts} attempts")]
    Blocked { url: String, attempts: u32 },

    /// Both the primary and the fallback fetch strategies failed.
    #[error("All fetch strategies failed (primary: {primary}; fallback: {fallback})")]
    Fallback {
        primary: Box<SearchError>,
        fallback: Box<SearchError>,
    },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Query translation failed.
    #[error("Translation failed: {0}")]
    Translation(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SearchError {
    /// Stable snake_case label used in tool error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::EngineNotFound(_) | Self::UnknownTool(_) => "not_found",
            Self::InvalidQuery(_) | Self::InvalidUrl(_) | Self::InvalidArguments(_) => "validation",
            Self::Http(_) | Self::HttpStatus { .. } | Self::Browser(_) => "network",
            Self::NameResolution(_) => "name_resolution",
            Self::Timeout(_) => "timeout",
            Self::Blocked { .. } => "blocked",
            Self::Fallback { .. } => "fallback_exhausted",
            Self::Parse(_) | Self::Json(_) => "parse",
            Self::Translation(_) => "translation",
            Self::Io(_) => "io",
        }
    }

    /// Returns true for failures raised while talking to a remote host.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Http(_)
                | Self::HttpStatus { .. }
                | Self::NameResolution(_)
                | Self::Timeout(_)
                | Self::Browser(_)
        )
    }

    /// Returns true for errors raised before any network activity.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidQuery(_) | Self::InvalidUrl(_) | Self::InvalidArguments(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_configuration() {
        let err = SearchError::Configuration("unknown crawler type 'ftp'".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: unknown crawler type 'ftp'"
        );
    }

    #[test]
    fn test_error_display_engine_not_found() {
        let err = SearchError::EngineNotFound("Altavista".to_string());
        assert_eq!(err.to_string(), "Search engine 'Altavista' not found");
    }

    #[test]
    fn test_error_display_invalid_query() {
        let err = SearchError::InvalidQuery("empty query".to_string());
        assert_eq!(err.to_string(), "Invalid query: empty query");
    }

    #[test]
    fn test_error_display_blocked() {
        let err = SearchError::Blocked {
            url: "https://www.google.com/".to_string(),
            attempts: 3,
        };
        assert_eq!(
            err.to_string(),
            "Blocked by bot challenge at https://www.google.com/ after 3 attempts"
        );
    }

    #[test]
    fn test_error_display_fallback_names_both() {
        let err = SearchError::Fallback {
            primary: Box::new(SearchError::HttpStatus {
                status: 403,
                url: "https://a.test/".to_string(),
            }),
            fallback: Box::new(SearchError::Timeout("https://a.test/".to_string())),
        };
        let msg = err.to_string();
        assert!(msg.contains("HTTP 403"));
        assert!(msg.contains("timed out"));
    }

    #[test]
    fn test_error_kinds_are_distinct() {
        let timeout = SearchError::Timeout("u".into());
        let dns = SearchError::NameResolution("u".into());
        let blocked = SearchError::Blocked {
            url: "u".into(),
            attempts: 3,
        };
        assert_eq!(timeout.kind(), "timeout");
        assert_eq!(dns.kind(), "name_resolution");
        assert_eq!(blocked.kind(), "blocked");
        assert_ne!(timeout.kind(), blocked.kind());
    }

    #[test]
    fn test_error_classification() {
        assert!(SearchError::Timeout("u".into()).is_network());
        assert!(!SearchError::Blocked {
            url: "u".into(),
            attempts: 1
        }
        .is_network());
        assert!(SearchError::InvalidUrl("x".into()).is_validation());
        assert!(!SearchError::Configuration("x".into()).is_network());
    }

    #[test]
    fn test_error_debug() {
        let err = SearchError::Timeout("https://example.com".into());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("Timeout"));
    }
}

//! Search engine descriptors and the sources they are loaded from.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Static metadata describing how to build a search URL for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineDescriptor {
    /// Display name, also the case-insensitive lookup key.
    pub name: String,
    /// Base URL; may already carry part of a query string.
    pub base_url: String,
    /// Parameter the search string is bound to.
    pub query_param: String,
    /// Parameter restricting result language, if the engine has one.
    #[serde(default)]
    pub lang_param: Option<String>,
    /// Language codes this engine serves.
    #[serde(default)]
    pub supported_languages: Vec<String>,
    /// Referer sent with requests. Defaults to the base URL's origin.
    #[serde(default)]
    pub referer: Option<String>,
    /// Language queries should be translated into before dispatch.
    #[serde(default)]
    pub query_language: Option<String>,
}

impl EngineDescriptor {
    /// Creates a descriptor with no language support.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        query_param: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            query_param: query_param.into(),
            lang_param: None,
            supported_languages: Vec::new(),
            referer: None,
            query_language: None,
        }
    }

    /// Sets the language parameter and the supported language codes.
    pub fn with_languages<I, S>(mut self, lang_param: Option<&str>, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lang_param = lang_param.map(str::to_string);
        self.supported_languages = languages.into_iter().map(Into::into).collect();
        self
    }

    /// Sets an explicit referer.
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// Sets the language queries are translated into.
    pub fn with_query_language(mut self, language: impl Into<String>) -> Self {
        self.query_language = Some(language.into());
        self
    }

    /// Returns true if `code` is one of the supported language codes.
    pub fn supports_language(&self, code: &str) -> bool {
        self.supported_languages.iter().any(|l| l == code)
    }

    /// Returns true if this descriptor answers to `name` (case-insensitive).
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

/// Top-level shape of an engine configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineFile {
    #[serde(default)]
    pub engines: Vec<EngineDescriptor>,
}

/// Read interface for engine configuration.
pub trait EngineSource: Send + Sync {
    /// Loads all descriptors.
    fn load(&self) -> Result<Vec<EngineDescriptor>>;

    /// Human-readable description of where descriptors come from.
    fn describe(&self) -> String;
}

/// Loads descriptors from a JSON file shaped like [`EngineFile`].
#[derive(Debug, Clone)]
pub struct FileEngineSource {
    path: PathBuf,
}

impl FileEngineSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EngineSource for FileEngineSource {
    fn load(&self) -> Result<Vec<EngineDescriptor>> {
        let raw = std::fs::read_to_string(&self.path)?;
        let file: EngineFile = serde_json::from_str(&raw)?;
        Ok(file.engines)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory descriptor list.
#[derive(Debug, Clone, Default)]
pub struct StaticEngineSource {
    engines: Vec<EngineDescriptor>,
}

impl StaticEngineSource {
    pub fn new(engines: Vec<EngineDescriptor>) -> Self {
        Self { engines }
    }

    /// The engines shipped in `search_engines.json`.
    pub fn builtin() -> Self {
        let file: EngineFile =
            serde_json::from_str(BUILTIN_ENGINES).unwrap_or_else(|_| EngineFile::default());
        Self::new(file.engines)
    }
}

impl EngineSource for StaticEngineSource {
    fn load(&self) -> Result<Vec<EngineDescriptor>> {
        Ok(self.engines.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory ({} engines)", self.engines.len())
    }
}

const BUILTIN_ENGINES: &str = include_str!("../search_engines.json");

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_descriptor_deserialization_defaults() {
        let json = r#"{"name":"Nate","base_url":"https://search.daum.net/nate","query_param":"q"}"#;
        let engine: EngineDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(engine.name, "Nate");
        assert!(engine.lang_param.is_none());
        assert!(engine.supported_languages.is_empty());
        assert!(engine.referer.is_none());
        assert!(engine.query_language.is_none());
    }

    #[test]
    fn test_descriptor_builder() {
        let engine = EngineDescriptor::new("Bing", "https://www.bing.com/search", "q")
            .with_languages(Some("setlang"), ["en", "ko"])
            .with_referer("https://www.bing.com/");
        assert_eq!(engine.lang_param.as_deref(), Some("setlang"));
        assert!(engine.supports_language("ko"));
        assert!(!engine.supports_language("ja"));
        assert_eq!(engine.referer.as_deref(), Some("https://www.bing.com/"));
    }

    #[test]
    fn test_matches_name_case_insensitive() {
        let engine = EngineDescriptor::new("Yahoo Japan", "https://search.yahoo.co.jp/search", "p");
        assert!(engine.matches_name("yahoo japan"));
        assert!(engine.matches_name("YAHOO JAPAN"));
        assert!(!engine.matches_name("yahoo"));
    }

    #[test]
    fn test_builtin_source_has_engines() {
        let engines = StaticEngineSource::builtin().load().unwrap();
        let names: Vec<_> = engines.iter().map(|e| e.name.as_str()).collect();
        for expected in ["Google", "Naver", "Daum", "Bing", "Nate", "Baidu", "Yahoo", "Yahoo Japan", "Yandex"] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn test_file_source_loads_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"engines":[{{"name":"Naver","base_url":"https://search.naver.com/search.naver","query_param":"query","supported_languages":["ko"]}}]}}"#
        )
        .unwrap();
        let source = FileEngineSource::new(file.path());
        let engines = source.load().unwrap();
        assert_eq!(engines.len(), 1);
        assert_eq!(engines[0].query_param, "query");
        assert_eq!(source.describe(), file.path().display().to_string());
    }

    #[test]
    fn test_file_source_missing_file_errors() {
        let source = FileEngineSource::new("/nonexistent/search_engines.json");
        assert!(matches!(source.load(), Err(crate::SearchError::Io(_))));
    }

    #[test]
    fn test_file_source_corrupt_json_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{engines: [}}").unwrap();
        let source = FileEngineSource::new(file.path());
        assert!(matches!(source.load(), Err(crate::SearchError::Json(_))));
    }
}

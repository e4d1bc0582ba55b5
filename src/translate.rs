//! Query translation hook for engines that expect a particular language.

use async_trait::async_trait;

use crate::Result;

/// Translates a query before it is sent to an engine with a `query_language`.
#[async_trait]
pub trait QueryTranslator: Send + Sync {
    async fn translate(&self, query: &str, target_lang: &str) -> Result<String>;
}

/// Translator that returns queries unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTranslator;

#[async_trait]
impl QueryTranslator for IdentityTranslator {
    async fn translate(&self, query: &str, _target_lang: &str) -> Result<String> {
        Ok(query.to_string())
    }
}

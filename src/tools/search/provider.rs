use async_trait::async_trait;

use super::{Article, ProviderError};

/// A web search backend the [`SearchAdapter`](super::SearchAdapter) can wrap.
///
/// One call to [`SearchProvider::search`] must issue at most one outbound request.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Human readable provider name, used in logs and messages.
    fn name(&self) -> String;

    async fn search(&self, query: &str) -> Result<Vec<Article>, ProviderError>;
}

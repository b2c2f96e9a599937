use async_trait::async_trait;

use crate::tools::{Tool, ToolError};

use super::{Article, DuckDuckGoSearch, SearchProvider};

pub const RATE_LIMIT_FALLBACK: &str = "Sorry, web search is temporarily unavailable because the \
    search provider is limiting requests. Please try again in a little while or rely on the \
    other tools.";

/// How search hits are rendered into the tool result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Snippet texts joined by a single space.
    #[default]
    Snippets,
    /// `[title](link)` followed by the snippet, hits separated by `---`.
    Articles,
}

/// Web search tool that never fails on provider throttling.
///
/// Recoverable provider failures are turned into a fixed apology message, so
/// the agent sees a normal result. Every other failure is returned as
/// [`ToolError::Provider`]. Partial results are never mixed with the apology.
pub struct SearchAdapter<P> {
    provider: P,
    name: String,
    description: String,
    output_format: OutputFormat,
    fallback_message: String,
}

impl<P> SearchAdapter<P>
where
    P: SearchProvider,
{
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            name: "Search".into(),
            description: "A web search engine. Useful for when you need to answer questions \
                about current events. Input should be a search query."
                .into(),
            output_format: OutputFormat::default(),
            fallback_message: RATE_LIMIT_FALLBACK.into(),
        }
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_output_format(mut self, output_format: OutputFormat) -> Self {
        self.output_format = output_format;
        self
    }

    pub fn with_fallback_message<S: Into<String>>(mut self, fallback_message: S) -> Self {
        self.fallback_message = fallback_message.into();
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn render(&self, articles: &[Article]) -> String {
        if articles.is_empty() {
            return format!(
                "No good {} Search Result was found",
                self.provider.name()
            );
        }

        match self.output_format {
            OutputFormat::Snippets => articles
                .iter()
                .map(Article::snippet)
                .collect::<Vec<_>>()
                .join(" "),
            OutputFormat::Articles => articles
                .iter()
                .map(Article::to_string)
                .collect::<Vec<_>>()
                .join("\n---\n"),
        }
    }
}

impl Default for SearchAdapter<DuckDuckGoSearch> {
    fn default() -> Self {
        Self::new(DuckDuckGoSearch::default())
    }
}

#[async_trait]
impl<P> Tool for SearchAdapter<P>
where
    P: SearchProvider,
{
    fn name(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn strict(&self) -> bool {
        true
    }

    async fn invoke_async(&self, query: &str) -> Result<String, ToolError> {
        log::debug!("{} search: {query:?}", self.provider.name());

        match self.provider.search(query).await {
            Ok(articles) => Ok(self.render(&articles)),
            Err(e) if e.is_recoverable() => {
                log::warn!("{e}, answering with the fallback message");
                Ok(self.fallback_message.clone())
            }
            Err(e) => Err(e.into()),
        }
    }
}

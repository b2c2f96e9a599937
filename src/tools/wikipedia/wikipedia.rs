use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{header::USER_AGENT, Client};
use serde::{de::DeserializeOwned, Deserialize};
use url::Url;

use crate::{
    tools::{search::check_status, ProviderError, Tool, ToolError},
    utils::helper::truncate_chars,
};

const PROVIDER: &str = "Wikipedia";

const NO_RESULTS: &str = "No good Wikipedia Search Result was found";

const CLIENT_USER_AGENT: &str = concat!(
    env!("CARGO_PKG_NAME"),
    "/",
    env!("CARGO_PKG_VERSION"),
    " (lookup tool for LLM agents)"
);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: SearchQuery,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ExtractsResponse {
    query: ExtractsQuery,
}

#[derive(Debug, Deserialize)]
struct ExtractsQuery {
    #[serde(default)]
    pages: Vec<WikipediaPage>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
struct WikipediaPage {
    title: String,
    #[serde(default)]
    extract: String,
}

/// Looks up encyclopedia summaries through the MediaWiki action API.
pub struct Wikipedia {
    client: Client,
    lang: String,
    base_url: Option<String>,
    top_k_results: usize,
    doc_content_chars_max: usize,
    max_query_length: usize,
}

impl Wikipedia {
    /// Wikipedia language edition, e.g. `en` or `de`.
    pub fn with_lang<S: Into<String>>(mut self, lang: S) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_top_k_results(mut self, top_k_results: usize) -> Self {
        self.top_k_results = top_k_results;
        self
    }

    /// Caps the length of the whole tool result, in characters.
    pub fn with_doc_content_chars_max(mut self, doc_content_chars_max: usize) -> Self {
        self.doc_content_chars_max = doc_content_chars_max;
        self
    }

    /// Overrides the `api.php` endpoint derived from the language.
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn api_url(&self, params: &[(&str, &str)]) -> Result<Url, ProviderError> {
        let base_url = self
            .base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}.wikipedia.org/w/api.php", self.lang));

        let mut url = Url::parse(&base_url)?;
        url.query_pairs_mut()
            .append_pair("action", "query")
            .append_pair("format", "json")
            .append_pair("formatversion", "2")
            .extend_pairs(params);

        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ProviderError> {
        log::debug!("{PROVIDER} request: {url}");

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        check_status(PROVIDER, response.status(), &[])?;

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        serde_json::from_str(&body).map_err(|e| ProviderError::malformed(PROVIDER, e.to_string()))
    }

    async fn search_titles(&self, query: &str) -> Result<Vec<String>, ProviderError> {
        let limit = self.top_k_results.to_string();
        let url = self.api_url(&[
            ("list", "search"),
            ("srsearch", truncate_chars(query, self.max_query_length)),
            ("srlimit", limit.as_str()),
        ])?;

        let response: SearchResponse = self.get(url).await?;

        Ok(response
            .query
            .search
            .into_iter()
            .map(|hit| hit.title)
            .collect())
    }

    /// Fetches the intro extracts of `titles` in one request, keeping the search order.
    async fn fetch_pages(&self, titles: &[String]) -> Result<Vec<WikipediaPage>, ProviderError> {
        let joined = titles.join("|");
        let url = self.api_url(&[
            ("prop", "extracts"),
            ("exintro", "1"),
            ("explaintext", "1"),
            ("exlimit", "max"),
            ("redirects", "1"),
            ("titles", joined.as_str()),
        ])?;

        let response: ExtractsResponse = self.get(url).await?;

        let mut pages: HashMap<String, WikipediaPage> = response
            .query
            .pages
            .into_iter()
            .map(|page| (page.title.clone(), page))
            .collect();

        Ok(titles
            .iter()
            .filter_map(|title| pages.remove(title))
            .filter(|page| !page.extract.trim().is_empty())
            .collect())
    }
}

impl Default for Wikipedia {
    fn default() -> Self {
        Self {
            client: Client::new(),
            lang: "en".into(),
            base_url: None,
            top_k_results: 3,
            doc_content_chars_max: 4000,
            max_query_length: 300,
        }
    }
}

#[async_trait]
impl Tool for Wikipedia {
    fn name(&self) -> String {
        "wikipedia".into()
    }

    fn description(&self) -> String {
        "A wrapper around Wikipedia. Useful for when you need to answer general questions about \
        people, places, companies, facts, historical events, or other subjects. \
        Input should be a search query."
            .into()
    }

    async fn invoke_async(&self, query: &str) -> Result<String, ToolError> {
        let titles = self.search_titles(query).await?;
        if titles.is_empty() {
            return Ok(NO_RESULTS.into());
        }

        let pages = self.fetch_pages(&titles).await?;
        if pages.is_empty() {
            return Ok(NO_RESULTS.into());
        }

        let docs = pages
            .iter()
            .map(|page| format!("Page: {}\nSummary: {}", page.title, page.extract.trim()))
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(truncate_chars(&docs, self.doc_content_chars_max).to_string())
    }
}

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::{
    tools::{search::check_status, ProviderError, Tool, ToolError},
    utils::helper::{collapse_whitespace, truncate_chars},
};

const PROVIDER: &str = "arXiv";

const NO_RESULTS: &str = "No good Arxiv Result was found";

#[derive(Debug, Clone, PartialEq, Eq)]
struct ArxivEntry {
    published: String,
    title: String,
    authors: Vec<String>,
    summary: String,
}

impl std::fmt::Display for ArxivEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Published: {}\nTitle: {}\nAuthors: {}\nSummary: {}",
            self.published,
            self.title,
            self.authors.join(", "),
            self.summary
        )
    }
}

/// Looks up scientific articles on arxiv.org through the export API.
pub struct Arxiv {
    client: Client,
    base_url: String,
    top_k_results: usize,
    doc_content_chars_max: usize,
    max_query_length: usize,
}

impl Arxiv {
    pub fn with_top_k_results(mut self, top_k_results: usize) -> Self {
        self.top_k_results = top_k_results;
        self
    }

    /// Caps the length of the whole tool result, in characters.
    pub fn with_doc_content_chars_max(mut self, doc_content_chars_max: usize) -> Self {
        self.doc_content_chars_max = doc_content_chars_max;
        self
    }

    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn request_url(&self, query: &str) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&self.base_url)?;

        {
            let mut pairs = url.query_pairs_mut();
            match id_list(query) {
                Some(ids) => pairs.append_pair("id_list", &ids),
                None => pairs.append_pair(
                    "search_query",
                    truncate_chars(query, self.max_query_length),
                ),
            };
            pairs
                .append_pair("start", "0")
                .append_pair("max_results", &self.top_k_results.to_string());
        }

        Ok(url)
    }

    async fn lookup(&self, query: &str) -> Result<Vec<ArxivEntry>, ProviderError> {
        let url = self.request_url(query)?;
        log::debug!("{PROVIDER} request: {url}");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        // The export API answers 503 with a Retry-After header when throttling.
        check_status(
            PROVIDER,
            response.status(),
            &[StatusCode::SERVICE_UNAVAILABLE],
        )?;

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        parse_feed(&body)
    }
}

impl Default for Arxiv {
    fn default() -> Self {
        Self {
            client: Client::new(),
            base_url: "https://export.arxiv.org/api/query".into(),
            top_k_results: 3,
            doc_content_chars_max: 4000,
            max_query_length: 300,
        }
    }
}

#[async_trait]
impl Tool for Arxiv {
    fn name(&self) -> String {
        "arxiv".into()
    }

    fn description(&self) -> String {
        "A wrapper around Arxiv.org. Useful for when you need to answer questions about \
        Physics, Mathematics, Computer Science, Quantitative Biology, Quantitative Finance, \
        Statistics, Electrical Engineering, and Economics from scientific articles on arxiv.org. \
        Input should be a search query."
            .into()
    }

    async fn invoke_async(&self, query: &str) -> Result<String, ToolError> {
        let entries = self.lookup(query).await?;

        if entries.is_empty() {
            return Ok(NO_RESULTS.into());
        }

        let docs = entries
            .iter()
            .map(ArxivEntry::to_string)
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(truncate_chars(&docs, self.doc_content_chars_max).to_string())
    }
}

static ARXIV_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}\.\d{4,5}|[a-z\-]+(\.[A-Z]{2})?/\d{7})(v\d+)?$")
        .unwrap_or_else(|e| unreachable!("Invalid identifier regex: {e}"))
});

/// Returns the comma separated identifiers when every word of the query is an arXiv identifier.
fn id_list(query: &str) -> Option<String> {
    let ids = query.split_whitespace().collect::<Vec<_>>();
    if ids.is_empty() || !ids.iter().all(|id| ARXIV_ID.is_match(id)) {
        return None;
    }

    Some(ids.join(","))
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| unreachable!("Invalid selector {css}: {e:?}"))
}

fn first_text(element: ElementRef, selector: &Selector) -> String {
    element
        .select(selector)
        .next()
        .map(|e| collapse_whitespace(&e.text().collect::<String>()))
        .unwrap_or_default()
}

fn parse_feed(body: &str) -> Result<Vec<ArxivEntry>, ProviderError> {
    let document = Html::parse_document(body);

    let entry_selector = selector("entry");
    let id_selector = selector("id");
    let title_selector = selector("title");
    let summary_selector = selector("summary");
    let published_selector = selector("published");
    let author_selector = selector("author > name");

    let mut entries = Vec::new();
    for entry in document.select(&entry_selector) {
        let summary = first_text(entry, &summary_selector);

        // Invalid queries come back as a single entry pointing at the errors page.
        if first_text(entry, &id_selector).contains("arxiv.org/api/errors") {
            return Err(ProviderError::malformed(PROVIDER, summary));
        }

        let published = first_text(entry, &published_selector);
        entries.push(ArxivEntry {
            published: truncate_chars(&published, 10).to_string(),
            title: first_text(entry, &title_selector),
            authors: entry
                .select(&author_selector)
                .map(|name| collapse_whitespace(&name.text().collect::<String>()))
                .collect(),
            summary,
        });
    }

    Ok(entries)
}

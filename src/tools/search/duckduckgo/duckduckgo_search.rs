use async_trait::async_trait;
use reqwest::{header::USER_AGENT, Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use url::Url;

use crate::{
    tools::search::{check_status, Article, ProviderError, SearchProvider},
    utils::helper::collapse_whitespace,
};

use super::{Backend, SafeSearch, TimeLimit};

const PROVIDER: &str = "DuckDuckGo";

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Marker of the bot challenge page served instead of results when throttled.
const CHALLENGE_MARKERS: [&str; 2] = ["anomaly-modal", "challenge-form"];

pub struct DuckDuckGoSearch {
    client: Client,
    backend: Backend,
    base_url: Option<String>,
    max_results: usize,
    region: String,
    safe_search: SafeSearch,
    time_limit: Option<TimeLimit>,
}

impl DuckDuckGoSearch {
    pub fn new(backend: Backend) -> Self {
        Self {
            client: Client::new(),
            backend,
            base_url: None,
            max_results: 5,
            region: "wt-wt".into(),
            safe_search: SafeSearch::default(),
            time_limit: None,
        }
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Overrides the endpoint of the selected backend.
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// DuckDuckGo region code, e.g. `us-en` or `de-de`. `wt-wt` means no region.
    pub fn with_region<S: Into<String>>(mut self, region: S) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_safe_search(mut self, safe_search: SafeSearch) -> Self {
        self.safe_search = safe_search;
        self
    }

    pub fn with_time_limit(mut self, time_limit: TimeLimit) -> Self {
        self.time_limit = Some(time_limit);
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    fn request_url(&self, query: &str) -> Result<Url, ProviderError> {
        let base_url = self
            .base_url
            .as_deref()
            .unwrap_or_else(|| self.backend.default_url());
        let mut url = Url::parse(base_url)?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("q", query)
                .append_pair("kl", &self.region)
                .append_pair("kp", self.safe_search.as_param());

            if let Some(time_limit) = self.time_limit {
                pairs.append_pair("df", time_limit.as_param());
            }

            if self.backend == Backend::Api {
                pairs
                    .append_pair("format", "json")
                    .append_pair("no_html", "1")
                    .append_pair("skip_disambig", "1");
            }
        }

        Ok(url)
    }

    pub async fn search_articles(&self, query: &str) -> Result<Vec<Article>, ProviderError> {
        let url = self.request_url(query)?;
        log::debug!("{PROVIDER} {} request: {url}", self.backend);

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        // Throttled HTML requests get an empty 202 instead of results.
        check_status(PROVIDER, response.status(), &[StatusCode::ACCEPTED])?;

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        let mut articles = match self.backend {
            Backend::Api => parse_instant_answer(&body)?,
            Backend::Html => {
                check_challenge(&body)?;
                parse_html_results(&body)
            }
            Backend::Lite => {
                check_challenge(&body)?;
                parse_lite_results(&body)
            }
        };
        articles.truncate(self.max_results);

        Ok(articles)
    }
}

impl Default for DuckDuckGoSearch {
    fn default() -> Self {
        Self::new(Backend::default())
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    fn name(&self) -> String {
        PROVIDER.into()
    }

    async fn search(&self, query: &str) -> Result<Vec<Article>, ProviderError> {
        self.search_articles(query).await
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| unreachable!("Invalid selector {css}: {e:?}"))
}

fn text_of(element: ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn check_challenge(body: &str) -> Result<(), ProviderError> {
    if CHALLENGE_MARKERS.iter().any(|marker| body.contains(marker)) {
        return Err(ProviderError::Challenge {
            provider: PROVIDER.into(),
        });
    }
    Ok(())
}

fn parse_html_results(body: &str) -> Vec<Article> {
    let document = Html::parse_document(body);

    let result_selector = selector(".web-result");
    let result_title_selector = selector(".result__a");
    let result_url_selector = selector(".result__url");
    let result_snippet_selector = selector(".result__snippet");

    document
        .select(&result_selector)
        .filter_map(|result| {
            let title = text_of(result.select(&result_title_selector).next()?);
            let link = text_of(result.select(&result_url_selector).next()?);
            let snippet = text_of(result.select(&result_snippet_selector).next()?);

            Some(Article::new(title, link, snippet))
        })
        .collect()
}

fn parse_lite_results(body: &str) -> Vec<Article> {
    let document = Html::parse_document(body);

    let row_selector = selector("tr");
    let link_selector = selector("a.result-link");
    let snippet_selector = selector("td.result-snippet");

    let mut articles = Vec::new();
    let mut pending: Option<(String, String)> = None;

    // A result spans several rows: the link row, then its snippet row. A link
    // row without a snippet before the next link is dropped.
    for row in document.select(&row_selector) {
        if let Some(link) = row.select(&link_selector).next() {
            let href = link.value().attr("href").unwrap_or_default();
            pending = Some((text_of(link), href.to_string()));
        } else if let Some(snippet) = row.select(&snippet_selector).next() {
            if let Some((title, link)) = pending.take() {
                articles.push(Article::new(title, link, text_of(snippet)));
            }
        }
    }

    articles
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<RelatedTopic>,
    },
    Entry {
        #[serde(rename = "Text", default)]
        text: String,
        #[serde(rename = "FirstURL", default)]
        first_url: String,
    },
}

impl RelatedTopic {
    fn collect_into(self, articles: &mut Vec<Article>) {
        match self {
            RelatedTopic::Group { topics } => {
                topics
                    .into_iter()
                    .for_each(|topic| topic.collect_into(articles));
            }
            RelatedTopic::Entry { text, first_url } if !text.is_empty() => {
                let title = text.split(" - ").next().unwrap_or_default().to_string();
                articles.push(Article::new(title, first_url, text));
            }
            RelatedTopic::Entry { .. } => {}
        }
    }
}

fn parse_instant_answer(body: &str) -> Result<Vec<Article>, ProviderError> {
    let answer: InstantAnswer = serde_json::from_str(body)
        .map_err(|e| ProviderError::malformed(PROVIDER, e.to_string()))?;

    let mut articles = Vec::new();
    if !answer.abstract_text.is_empty() {
        articles.push(Article::new(
            answer.heading,
            answer.abstract_url,
            answer.abstract_text,
        ));
    }
    answer
        .related_topics
        .into_iter()
        .for_each(|topic| topic.collect_into(&mut articles));

    Ok(articles)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use mockito::Matcher;

    use super::*;
    use crate::tools::{search::SearchAdapter, Tool, ToolError};

    const HTML_RESULTS: &str = indoc! {r#"
        <html><body>
        <div class="result results_links results_links_deep web-result">
          <h2 class="result__title">
            <a rel="nofollow" class="result__a" href="https://www.rust-lang.org/">Rust Programming Language</a>
          </h2>
          <a class="result__url" href="https://www.rust-lang.org/">
            www.rust-lang.org
          </a>
          <a class="result__snippet" href="https://www.rust-lang.org/">A language empowering everyone
            to build reliable and efficient software.</a>
        </div>
        <div class="result results_links results_links_deep web-result">
          <h2 class="result__title">
            <a rel="nofollow" class="result__a" href="https://doc.rust-lang.org/book/">The Rust Programming Language - The Rust Book</a>
          </h2>
          <a class="result__url" href="https://doc.rust-lang.org/book/">doc.rust-lang.org/book</a>
          <a class="result__snippet" href="https://doc.rust-lang.org/book/">An introductory book about Rust.</a>
        </div>
        <div class="result results_links results_links_deep web-result">
          <h2 class="result__title">
            <a rel="nofollow" class="result__a" href="https://en.wikipedia.org/wiki/Rust">Rust - Wikipedia</a>
          </h2>
          <a class="result__url" href="https://en.wikipedia.org/wiki/Rust">en.wikipedia.org/wiki/Rust</a>
          <a class="result__snippet" href="https://en.wikipedia.org/wiki/Rust">Rust is an iron oxide.</a>
        </div>
        </body></html>
    "#};

    const LITE_RESULTS: &str = indoc! {r#"
        <html><body>
        <table>
          <tr><td>1.&nbsp;</td><td><a rel="nofollow" href="https://www.rust-lang.org/" class="result-link">Rust Programming Language</a></td></tr>
          <tr><td>&nbsp;</td><td class="result-snippet">A language empowering everyone to build reliable software.</td></tr>
          <tr><td>&nbsp;</td><td><span class="link-text">www.rust-lang.org</span></td></tr>
          <tr><td>2.&nbsp;</td><td><a rel="nofollow" href="https://crates.io/" class="result-link">crates.io: Rust Package Registry</a></td></tr>
          <tr><td>&nbsp;</td><td class="result-snippet">The Rust community's crate registry.</td></tr>
          <tr><td>&nbsp;</td><td><span class="link-text">crates.io</span></td></tr>
        </table>
        </body></html>
    "#};

    const LITE_RESULTS_WITH_AD: &str = indoc! {r#"
        <html><body>
        <table>
          <tr><td>1.&nbsp;</td><td><a rel="nofollow" href="https://ads.example.com/rust" class="result-link">Learn Rust Fast</a></td></tr>
          <tr><td>&nbsp;</td><td><span class="link-text">ads.example.com</span></td></tr>
          <tr><td>2.&nbsp;</td><td><a rel="nofollow" href="https://www.rust-lang.org/" class="result-link">Rust Programming Language</a></td></tr>
          <tr><td>&nbsp;</td><td class="result-snippet">A language empowering everyone to build reliable software.</td></tr>
          <tr><td>&nbsp;</td><td><span class="link-text">www.rust-lang.org</span></td></tr>
          <tr><td>3.&nbsp;</td><td><a rel="nofollow" href="https://crates.io/" class="result-link">crates.io: Rust Package Registry</a></td></tr>
          <tr><td>&nbsp;</td><td class="result-snippet">The Rust community's crate registry.</td></tr>
          <tr><td>&nbsp;</td><td><span class="link-text">crates.io</span></td></tr>
        </table>
        </body></html>
    "#};

    const INSTANT_ANSWER: &str = r#"{
        "Heading": "Rust (programming language)",
        "AbstractText": "Rust is a general-purpose programming language.",
        "AbstractURL": "https://en.wikipedia.org/wiki/Rust_(programming_language)",
        "RelatedTopics": [
            {
                "FirstURL": "https://duckduckgo.com/Cargo",
                "Text": "Cargo - The Rust package manager."
            },
            {
                "Name": "See also",
                "Topics": [
                    {
                        "FirstURL": "https://duckduckgo.com/Ferris",
                        "Text": "Ferris - The unofficial Rust mascot."
                    }
                ]
            }
        ]
    }"#;

    const CHALLENGE_PAGE: &str = r#"<html><body><div class="anomaly-modal__title">Unfortunately, bots use DuckDuckGo too.</div></body></html>"#;

    #[tokio::test]
    async fn test_html_backend_parses_results() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/html/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "rust language".into()),
                Matcher::UrlEncoded("kl".into(), "wt-wt".into()),
                Matcher::UrlEncoded("kp".into(), "-1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body(HTML_RESULTS)
            .create_async()
            .await;

        let search = DuckDuckGoSearch::new(Backend::Html)
            .with_base_url(format!("{}/html/", server.url()))
            .with_max_results(2);

        let articles = search.search_articles("rust language").await.unwrap();

        assert_eq!(
            articles,
            vec![
                Article::new(
                    "Rust Programming Language",
                    "www.rust-lang.org",
                    "A language empowering everyone to build reliable and efficient software."
                ),
                Article::new(
                    "The Rust Programming Language - The Rust Book",
                    "doc.rust-lang.org/book",
                    "An introductory book about Rust."
                ),
            ]
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_lite_backend_parses_results() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/lite/")
            .match_query(Matcher::UrlEncoded("q".into(), "rust".into()))
            .with_status(200)
            .with_body(LITE_RESULTS)
            .create_async()
            .await;

        let search = DuckDuckGoSearch::new(Backend::Lite)
            .with_base_url(format!("{}/lite/", server.url()));

        let articles = search.search_articles("rust").await.unwrap();

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title(), "Rust Programming Language");
        assert_eq!(articles[0].link(), "https://www.rust-lang.org/");
        assert_eq!(
            articles[0].snippet(),
            "A language empowering everyone to build reliable software."
        );
        assert_eq!(articles[1].link(), "https://crates.io/");
        mock.assert_async().await;
    }

    #[test]
    fn test_lite_results_skip_rows_without_snippet() {
        let articles = parse_lite_results(LITE_RESULTS_WITH_AD);

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title(), "Rust Programming Language");
        assert_eq!(articles[0].link(), "https://www.rust-lang.org/");
        assert_eq!(
            articles[0].snippet(),
            "A language empowering everyone to build reliable software."
        );
        assert_eq!(articles[1].title(), "crates.io: Rust Package Registry");
        assert_eq!(articles[1].link(), "https://crates.io/");
        assert_eq!(articles[1].snippet(), "The Rust community's crate registry.");
    }

    #[tokio::test]
    async fn test_api_backend_parses_instant_answer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "rust".into()),
                Matcher::UrlEncoded("format".into(), "json".into()),
                Matcher::UrlEncoded("df".into(), "w".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/x-javascript")
            .with_body(INSTANT_ANSWER)
            .create_async()
            .await;

        let search = DuckDuckGoSearch::new(Backend::Api)
            .with_base_url(format!("{}/", server.url()))
            .with_time_limit(TimeLimit::Week);

        let articles = search.search_articles("rust").await.unwrap();

        assert_eq!(articles.len(), 3);
        assert_eq!(articles[0].title(), "Rust (programming language)");
        assert_eq!(
            articles[0].snippet(),
            "Rust is a general-purpose programming language."
        );
        assert_eq!(articles[1].title(), "Cargo");
        assert_eq!(articles[2].link(), "https://duckduckgo.com/Ferris");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_backend_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let search =
            DuckDuckGoSearch::new(Backend::Api).with_base_url(format!("{}/", server.url()));

        let result = search.search_articles("rust").await;

        assert!(matches!(result, Err(ProviderError::Malformed { .. })));
    }

    #[tokio::test]
    async fn test_throttling_statuses_are_rate_limits() {
        for status in [202, 429] {
            let mut server = mockito::Server::new_async().await;
            server
                .mock("GET", "/html/")
                .match_query(Matcher::Any)
                .with_status(status)
                .create_async()
                .await;

            let search = DuckDuckGoSearch::default().with_base_url(format!("{}/html/", server.url()));

            let result = search.search_articles("rust").await;

            match result {
                Err(ProviderError::RateLimited { status: got, .. }) => {
                    assert_eq!(got, status as u16)
                }
                other => panic!("expected rate limit, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_challenge_page_is_recoverable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/html/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(CHALLENGE_PAGE)
            .create_async()
            .await;

        let search = DuckDuckGoSearch::default().with_base_url(format!("{}/html/", server.url()));

        let error = search.search_articles("rust").await.unwrap_err();

        assert!(matches!(error, ProviderError::Challenge { .. }));
        assert!(error.is_recoverable());
    }

    #[tokio::test]
    async fn test_server_error_is_not_recoverable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/html/")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let search = SearchAdapter::new(
            DuckDuckGoSearch::default().with_base_url(format!("{}/html/", server.url())),
        );

        let result = search.invoke_async("rust").await;

        assert!(matches!(
            result,
            Err(ToolError::Provider(ProviderError::Status { status: 500, .. }))
        ));
    }

    #[tokio::test]
    async fn test_adapter_over_rate_limited_provider() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/html/")
            .match_query(Matcher::Any)
            .with_status(429)
            .expect(1)
            .create_async()
            .await;

        let search = SearchAdapter::new(
            DuckDuckGoSearch::default().with_base_url(format!("{}/html/", server.url())),
        );

        let result = search
            .call(serde_json::json!({ "query": "rust" }))
            .await
            .unwrap();

        assert_eq!(result, crate::tools::search::RATE_LIMIT_FALLBACK);
        mock.assert_async().await;
    }

    #[test]
    fn test_blocking_invoke_against_html_backend() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/html/")
            .match_query(Matcher::UrlEncoded("q".into(), "rust".into()))
            .with_status(200)
            .with_body(HTML_RESULTS)
            .expect(1)
            .create();

        let search = SearchAdapter::new(
            DuckDuckGoSearch::default()
                .with_base_url(format!("{}/html/", server.url()))
                .with_max_results(2),
        );

        let result = search.invoke("rust").unwrap();

        assert_eq!(
            result,
            "A language empowering everyone to build reliable and efficient software. \
             An introductory book about Rust."
        );
        mock.assert();
    }

    #[test]
    fn test_request_url() {
        let search = DuckDuckGoSearch::new(Backend::Lite)
            .with_region("de-de")
            .with_safe_search(SafeSearch::Off);

        let url = search.request_url("rust & cargo").unwrap();

        assert_eq!(
            url.as_str(),
            "https://lite.duckduckgo.com/lite/?q=rust+%26+cargo&kl=de-de&kp=-2"
        );
    }

    #[tokio::test]
    #[ignore]
    async fn duckduckgosearch_tool() {
        let tool = SearchAdapter::new(DuckDuckGoSearch::default().with_max_results(5));

        let result = tool
            .call(serde_json::json!({ "query": "Who is the current President of Peru?" }))
            .await
            .unwrap();

        println!("{}", result);
    }
}

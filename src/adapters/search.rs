use crate::domain::model::SearchHit;
use crate::domain::ports::SearchProvider;
use crate::utils::error::{FlowError, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

pub const DEFAULT_SEARCH_BASE_URL: &str = "https://html.duckduckgo.com";

const CLIENT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Search adapter for DuckDuckGo's HTML endpoint. The base URL is
/// configurable so tests can point it at a mock server.
pub struct DuckDuckGoClient {
    client: reqwest::Client,
    base_url: String,
}

impl DuckDuckGoClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let url = format!("{}/html/", self.base_url);
        tracing::debug!("Search request to {} for query: {}", url, query);
        let response = self
            .client
            .get(&url)
            .query(&[("q", query)])
            .header(reqwest::header::USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FlowError::ProcessingError {
                message: format!("search request failed with status: {}", response.status()),
            });
        }

        let body = response.text().await?;
        Ok(parse_result_page(&body, max_results))
    }
}

fn parse_result_page(html: &str, max_results: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    let result_selector = Selector::parse("div.result").expect("static selector");
    let link_selector = Selector::parse("a.result__a").expect("static selector");
    let snippet_selector = Selector::parse(".result__snippet").expect("static selector");

    let mut hits = Vec::new();
    for result in document.select(&result_selector) {
        let Some(link) = result.select(&link_selector).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let title = collapse_whitespace(&link.text().collect::<String>());
        let snippet = result
            .select(&snippet_selector)
            .next()
            .map(|s| collapse_whitespace(&s.text().collect::<String>()))
            .unwrap_or_default();

        hits.push(SearchHit {
            title,
            url: resolve_redirect(href),
            snippet,
        });
        if hits.len() >= max_results {
            break;
        }
    }
    hits
}

/// DuckDuckGo wraps result targets in a `/l/?uddg=<encoded>` redirect link;
/// unwrap it back to the real URL. Direct links pass through unchanged.
fn resolve_redirect(href: &str) -> String {
    if !href.contains("uddg=") {
        return href.to_string();
    }
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{}", href)
    } else {
        href.to_string()
    };
    match Url::parse(&absolute) {
        Ok(parsed) => parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_else(|| href.to_string()),
        Err(_) => href.to_string(),
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

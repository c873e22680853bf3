use crate::domain::model::{Article, ArticleContent, ResearchPlan};
use crate::domain::ports::SearchProvider;
use crate::utils::error::Result;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use url::Url;

pub const DEFAULT_MAX_RESULTS: usize = 10;
pub const DEFAULT_QUERY_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SEARCH_DOMAIN: &str = "arxiv.org";

const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.107 Safari/537.36",
];

const CONTENT_CLASS_HINTS: [&str; 4] = ["content", "article", "entry", "post"];

static ARXIV_ID_RE: OnceLock<Regex> = OnceLock::new();

pub struct SearchAgent {
    provider: Arc<dyn SearchProvider>,
    client: reqwest::Client,
    domain: String,
    max_results: usize,
    query_delay: Duration,
    fetch_timeout: Duration,
    ua_cursor: AtomicUsize,
}

impl SearchAgent {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        domain: &str,
        max_results: usize,
        query_delay: Duration,
        fetch_timeout: Duration,
    ) -> Result<Self> {
        tracing::info!("Initializing SearchAgent for domain {}", domain);
        let client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()?;
        Ok(Self {
            provider,
            client,
            domain: domain.to_string(),
            max_results: max_results.max(1),
            query_delay,
            fetch_timeout,
            ua_cursor: AtomicUsize::new(0),
        })
    }

    fn next_user_agent(&self) -> &'static str {
        let i = self.ua_cursor.fetch_add(1, Ordering::Relaxed);
        USER_AGENTS[i % USER_AGENTS.len()]
    }

    /// Run every plan query against the search provider, keeping only
    /// deduplicated results from the target domain; arXiv results also get
    /// a derived PDF URL.
    pub async fn search_articles(&self, plan: &ResearchPlan) -> Result<Vec<Article>> {
        tracing::info!("Starting article search...");
        let queries = &plan.plan.search_queries;
        if queries.is_empty() {
            tracing::warn!("Plan contains no search queries");
            return Ok(Vec::new());
        }
        // Distribute the result budget across queries.
        let per_query = (self.max_results / queries.len()).max(1);

        let mut results: Vec<Article> = Vec::new();
        for (qi, query) in queries.iter().enumerate() {
            tracing::info!("Executing search query: {}", query);
            let enhanced = format!("site:{} {}", self.domain, query);
            match self.provider.search(&enhanced, per_query).await {
                Ok(hits) => {
                    for hit in hits {
                        if !matches_domain(&hit.url, &self.domain) {
                            continue;
                        }
                        if results.iter().any(|r| r.url == hit.url) {
                            continue;
                        }
                        let pdf_url = derive_pdf_url(&hit.url);
                        tracing::info!("Found article: {}", hit.title);
                        results.push(Article {
                            title: hit.title,
                            url: hit.url,
                            snippet: hit.snippet,
                            source: self.domain.clone(),
                            query: query.clone(),
                            pdf_url,
                        });
                    }
                }
                Err(e) => {
                    tracing::error!("Error searching for query '{}': {}", query, e);
                }
            }
            // Be nice to the search engine.
            if qi + 1 < queries.len() && !self.query_delay.is_zero() {
                tokio::time::sleep(self.query_delay).await;
            }
        }
        tracing::info!("Search completed. Found {} unique articles", results.len());
        Ok(results)
    }

    /// Fetch and extract an article page. Failures are captured in the
    /// returned record rather than propagated.
    pub async fn fetch_article_content(&self, url: &str) -> ArticleContent {
        tracing::info!("Fetching content from URL: {}", url);
        match self.try_fetch(url).await {
            Ok((title, content)) => {
                tracing::info!("Successfully fetched content ({} characters)", content.len());
                ArticleContent {
                    title,
                    url: url.to_string(),
                    content_length: content.chars().count(),
                    content,
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!("Error fetching article from {}: {}", url, e);
                ArticleContent {
                    title: String::new(),
                    url: url.to_string(),
                    content: String::new(),
                    content_length: 0,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<(String, String)> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, self.next_user_agent())
            .timeout(self.fetch_timeout)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        Ok(extract_page(&body))
    }
}

pub fn matches_domain(url: &str, domain: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.host_str()
                .map(|h| h == domain || h.ends_with(&format!(".{}", domain)))
        })
        .unwrap_or(false)
}

pub fn is_arxiv_url(url: &str) -> bool {
    matches_domain(url, DEFAULT_SEARCH_DOMAIN)
}

/// Derive a direct PDF URL from an arXiv page URL. Non-arXiv URLs have no
/// derivable PDF location.
pub fn derive_pdf_url(url: &str) -> Option<String> {
    if !is_arxiv_url(url) {
        return None;
    }
    if url.contains("/abs/") {
        return Some(format!("{}.pdf", url.replace("/abs/", "/pdf/")));
    }
    if url.contains("/pdf/") {
        return Some(if url.ends_with(".pdf") {
            url.to_string()
        } else {
            format!("{}.pdf", url)
        });
    }
    let re = ARXIV_ID_RE.get_or_init(|| Regex::new(r"(\d+\.\d+)").expect("static regex"));
    re.captures(url)
        .map(|c| format!("https://arxiv.org/pdf/{}.pdf", &c[1]))
}

/// Pull the page title and the article-looking paragraphs out of an HTML
/// body: paragraphs of more than ten words inside content-ish containers,
/// falling back to all paragraphs, capped at the first twenty.
fn extract_page(body: &str) -> (String, String) {
    let document = Html::parse_document(body);
    let title_selector = Selector::parse("title").expect("static selector");
    let container_selector = Selector::parse("article, main, div").expect("static selector");
    let p_selector = Selector::parse("p").expect("static selector");

    let title = document
        .select(&title_selector)
        .next()
        .map(|t| collapse_whitespace(&t.text().collect::<String>()))
        .unwrap_or_default();

    let mut paragraphs: Vec<String> = Vec::new();
    for container in document.select(&container_selector) {
        let class_attr = container
            .value()
            .attr("class")
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !CONTENT_CLASS_HINTS.iter().any(|hint| class_attr.contains(hint)) {
            continue;
        }
        collect_paragraphs(container.select(&p_selector), &mut paragraphs);
    }
    if paragraphs.is_empty() {
        collect_paragraphs(document.select(&p_selector), &mut paragraphs);
    }
    paragraphs.truncate(20);

    (title, paragraphs.join("\n\n"))
}

fn collect_paragraphs<'a>(
    nodes: impl Iterator<Item = scraper::ElementRef<'a>>,
    out: &mut Vec<String>,
) {
    for p in nodes {
        let text = collapse_whitespace(&p.text().collect::<String>());
        if !text.is_empty() && text.split_whitespace().count() > 10 && !out.contains(&text) {
            out.push(text);
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

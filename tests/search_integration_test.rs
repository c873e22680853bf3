use httpmock::prelude::*;
use research_flow::adapters::DuckDuckGoClient;
use research_flow::agents::search::{
    SearchAgent, DEFAULT_FETCH_TIMEOUT, DEFAULT_SEARCH_DOMAIN,
};
use research_flow::domain::ports::SearchProvider;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_duckduckgo_client_parses_results() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/html/").query_param_exists("q");
        then.status(200).header("Content-Type", "text/html").body(
            r#"<html><body>
                <div class="result">
                  <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Farxiv.org%2Fabs%2F2301.01234&rut=abc">
                    Attention Is Still All You Need
                  </a>
                  <a class="result__snippet">Follow-up study on attention.</a>
                </div>
                <div class="result">
                  <a class="result__a" href="https://arxiv.org/abs/2302.05678">Second Paper</a>
                </div>
            </body></html>"#,
        );
    });

    let client = DuckDuckGoClient::new(&server.base_url()).unwrap();
    let hits = client.search("site:arxiv.org attention", 10).await.unwrap();

    mock.assert();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].url, "https://arxiv.org/abs/2301.01234");
    assert_eq!(hits[0].title, "Attention Is Still All You Need");
    assert_eq!(hits[1].url, "https://arxiv.org/abs/2302.05678");
}

#[tokio::test]
async fn test_duckduckgo_client_http_failure() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/html/");
        then.status(503);
    });

    let client = DuckDuckGoClient::new(&server.base_url()).unwrap();
    let err = client.search("query", 10).await.unwrap_err();
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_fetch_article_content_extracts_paragraphs() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/article");
        then.status(200).header("Content-Type", "text/html").body(
            r#"<html><head><title>An Article</title></head><body>
                <article class="post-content">
                  <p>This article body paragraph definitely contains more than ten words of useful content.</p>
                  <p>tiny</p>
                </article>
            </body></html>"#,
        );
    });

    let agent = SearchAgent::new(
        Arc::new(DuckDuckGoClient::new(&server.base_url()).unwrap()),
        DEFAULT_SEARCH_DOMAIN,
        10,
        Duration::ZERO,
        DEFAULT_FETCH_TIMEOUT,
    )
    .unwrap();

    let content = agent.fetch_article_content(&server.url("/article")).await;
    mock.assert();
    assert!(content.error.is_none());
    assert_eq!(content.title, "An Article");
    assert!(content.content.contains("more than ten words"));
    assert!(!content.content.contains("tiny"));
    assert_eq!(content.content_length, content.content.chars().count());
}

#[tokio::test]
async fn test_fetch_article_content_records_http_errors() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/missing");
        then.status(404);
    });

    let agent = SearchAgent::new(
        Arc::new(DuckDuckGoClient::new(&server.base_url()).unwrap()),
        DEFAULT_SEARCH_DOMAIN,
        10,
        Duration::ZERO,
        DEFAULT_FETCH_TIMEOUT,
    )
    .unwrap();

    let content = agent.fetch_article_content(&server.url("/missing")).await;
    assert!(content.error.is_some());
    assert!(content.content.is_empty());
    assert_eq!(content.content_length, 0);
}

use httpmock::prelude::*;
use research_flow::adapters::{DuckDuckGoClient, LocalStorage};
use research_flow::core::{build_research_workflow, WorkflowOptions};
use research_flow::llm::{ChatClient, HashEmbedder};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn chat_reply(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [
            {"message": {"role": "assistant", "content": content}}
        ]
    })
}

fn options_for(server_host_dir: &TempDir) -> WorkflowOptions {
    WorkflowOptions {
        data_dir: server_host_dir.path().to_path_buf(),
        search_domain: "127.0.0.1".to_string(),
        max_results: 5,
        query_delay: Duration::ZERO,
        fetch_timeout: Duration::from_secs(5),
        concurrent_requests: 2,
        rag_num_results: 3,
    }
}

#[tokio::test]
async fn test_full_research_workflow_end_to_end() {
    let server = MockServer::start();
    let temp = TempDir::new().unwrap();

    let plan_json = serde_json::json!({
        "subtopics": ["error correction codes"],
        "search_queries": ["quantum error correction"],
        "expected_outcome": "an overview of QEC literature",
        "research_strategy": "survey recent papers"
    })
    .to_string();

    let plan_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .body_contains("Format your response as a JSON");
        then.status(200).json_body(chat_reply(&plan_json));
    });
    let abstract_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .body_contains("concise academic abstract");
        then.status(200)
            .json_body(chat_reply("A mock abstract of the retrieved paper."));
    });
    let writing_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .body_contains("complete LaTeX academic report");
        then.status(200).json_body(chat_reply(
            "\\documentclass{article}\n\\begin{document}\nReport body\n\\end{document}",
        ));
    });

    let article_url = server.url("/papers/qec-survey");
    let search_page = format!(
        r#"<html><body>
            <div class="result">
              <a class="result__a" href="{url}">A Survey of Quantum Error Correction</a>
              <a class="result__snippet">Survey of QEC approaches.</a>
            </div>
        </body></html>"#,
        url = article_url
    );
    let search_mock = server.mock(|when, then| {
        when.method(GET).path("/html/");
        then.status(200)
            .header("Content-Type", "text/html")
            .body(search_page);
    });
    let article_mock = server.mock(|when, then| {
        when.method(GET).path("/papers/qec-survey");
        then.status(200).header("Content-Type", "text/html").body(
            r#"<html><head><title>A Survey of Quantum Error Correction</title></head><body>
                 <div class="article-content">
                   <p>Quantum error correction protects fragile quantum information against decoherence by encoding logical qubits redundantly.</p>
                 </div>
               </body></html>"#,
        );
    });

    let llm = Arc::new(ChatClient::ollama("mock-model", &server.base_url()).unwrap());
    let search_provider = Arc::new(DuckDuckGoClient::new(&server.base_url()).unwrap());
    let embedder = Arc::new(HashEmbedder::default());
    let storage = LocalStorage::new(temp.path());

    let (workflow, _rag) = build_research_workflow(
        llm,
        search_provider,
        embedder,
        storage,
        &options_for(&temp),
    )
    .unwrap();

    let outcome = workflow.execute("quantum error correction").await.unwrap();

    plan_mock.assert();
    search_mock.assert();
    article_mock.assert();
    abstract_mock.assert();
    writing_mock.assert();

    let state = &outcome.state;
    assert_eq!(state.articles.len(), 1);
    assert_eq!(
        state.articles[0].title,
        "A Survey of Quantum Error Correction"
    );
    assert_eq!(state.articles[0].url, article_url);
    assert_eq!(state.url_to_filepath.len(), 1);

    assert_eq!(state.abstracts.len(), 1);
    assert!(state.abstracts[0].error.is_none());
    assert_eq!(
        state.abstracts[0].abstract_text,
        "A mock abstract of the retrieved paper."
    );

    let report = state.report.as_ref().unwrap();
    assert_eq!(report.total_articles, 1);
    assert_eq!(report.articles_with_abstracts, 1);
    assert_eq!(report.sources.get("127.0.0.1"), Some(&1));

    // The artifacts are on disk under the data dir.
    let final_csv = state.final_csv_path.as_ref().unwrap();
    let csv_text = std::fs::read_to_string(temp.path().join(final_csv)).unwrap();
    assert!(csv_text.contains("A mock abstract of the retrieved paper."));

    let report_name = state.report_path.as_ref().unwrap();
    let tex = std::fs::read_to_string(temp.path().join(report_name)).unwrap();
    assert!(tex.starts_with("\\documentclass"));

    // All six stages ran.
    assert_eq!(outcome.stages.len(), 6);
    let names: Vec<&str> = outcome
        .stages
        .iter()
        .map(|s| s.stage_name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "planning",
            "searching",
            "integration",
            "abstracting",
            "transformation",
            "writing"
        ]
    );
}

#[tokio::test]
async fn test_workflow_without_search_results_skips_abstracting() {
    let server = MockServer::start();
    let temp = TempDir::new().unwrap();

    let plan_json = serde_json::json!({
        "subtopics": ["niche"],
        "search_queries": ["an extremely obscure query"],
        "expected_outcome": "little is expected",
        "research_strategy": "search anyway"
    })
    .to_string();

    server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .body_contains("Format your response as a JSON");
        then.status(200).json_body(chat_reply(&plan_json));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .body_contains("complete LaTeX academic report");
        then.status(200).json_body(chat_reply(
            "\\documentclass{article}\\begin{document}Empty survey\\end{document}",
        ));
    });
    server.mock(|when, then| {
        when.method(GET).path("/html/");
        then.status(200)
            .header("Content-Type", "text/html")
            .body("<html><body>no results</body></html>");
    });

    let llm = Arc::new(ChatClient::ollama("mock-model", &server.base_url()).unwrap());
    let search_provider = Arc::new(DuckDuckGoClient::new(&server.base_url()).unwrap());
    let embedder = Arc::new(HashEmbedder::default());
    let storage = LocalStorage::new(temp.path());

    let (workflow, _rag) = build_research_workflow(
        llm,
        search_provider,
        embedder,
        storage,
        &options_for(&temp),
    )
    .unwrap();

    let outcome = workflow.execute("obscure topic").await.unwrap();
    let state = &outcome.state;

    assert!(state.articles.is_empty());
    assert!(state.url_to_filepath.is_empty());
    assert!(state.abstracts.is_empty());

    let report = state.report.as_ref().unwrap();
    assert_eq!(report.total_articles, 0);
    assert_eq!(report.articles_with_abstracts, 0);

    // Abstracting was skipped; the other five stages ran.
    assert_eq!(outcome.stages.len(), 5);
    assert!(outcome
        .stages
        .iter()
        .all(|s| s.stage_name != "abstracting"));

    // The report is still written, over an empty article set.
    let tex = std::fs::read_to_string(temp.path().join(state.report_path.as_ref().unwrap())).unwrap();
    assert!(tex.contains("Empty survey"));
}

#[tokio::test]
async fn test_workflow_fails_with_stage_name_on_llm_outage() {
    let server = MockServer::start();
    let temp = TempDir::new().unwrap();

    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(500).body("backend down");
    });

    let llm = Arc::new(ChatClient::ollama("mock-model", &server.base_url()).unwrap());
    let search_provider = Arc::new(DuckDuckGoClient::new(&server.base_url()).unwrap());
    let embedder = Arc::new(HashEmbedder::default());
    let storage = LocalStorage::new(temp.path());

    let (workflow, _rag) = build_research_workflow(
        llm,
        search_provider,
        embedder,
        storage,
        &options_for(&temp),
    )
    .unwrap();

    let err = workflow.execute("anything").await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("planning"));
    assert!(message.contains("500"));
}

use httpmock::prelude::*;
use research_flow::domain::ports::{EmbeddingProvider, LanguageModel};
use research_flow::llm::{
    build_model, list_ollama_models, ChatClient, GenerationConfig, OllamaEmbedder, Provider,
};
use research_flow::FlowError;

fn chat_reply(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [
            {"message": {"role": "assistant", "content": content}}
        ]
    })
}

#[tokio::test]
async fn test_openai_chat_request_shape() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .header("authorization", "Bearer test-key")
            .body_contains("\"model\":\"gpt-4\"")
            .body_contains("summarize this");
        then.status(200).json_body(chat_reply("hello from the mock"));
    });

    let client = ChatClient::openai("gpt-4", "test-key".to_string(), &server.base_url()).unwrap();
    let reply = client.generate("summarize this").await.unwrap();

    mock.assert();
    assert_eq!(reply, "hello from the mock");
}

#[tokio::test]
async fn test_generation_config_is_sent() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .body_contains("\"max_tokens\":512");
        then.status(200).json_body(chat_reply("ok"));
    });

    let client = ChatClient::ollama("llama3", &server.base_url())
        .unwrap()
        .with_config(GenerationConfig {
            temperature: 0.2,
            max_tokens: 512,
        });
    client.generate("prompt").await.unwrap();
    mock.assert();
}

#[tokio::test]
async fn test_api_error_carries_status_and_body() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(401).body("invalid api key");
    });

    let client = ChatClient::openai("gpt-4", "bad-key".to_string(), &server.base_url()).unwrap();
    let err = client.generate("prompt").await.unwrap_err();
    match err {
        FlowError::LlmError { provider, message } => {
            assert_eq!(provider, "openai");
            assert!(message.contains("401"));
            assert!(message.contains("invalid api key"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_empty_choices_is_an_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200).json_body(serde_json::json!({"choices": []}));
    });

    let client = ChatClient::ollama("llama3", &server.base_url()).unwrap();
    let err = client.generate("prompt").await.unwrap_err();
    assert!(err.to_string().contains("empty choices"));
}

#[test]
fn test_build_model_requires_openai_key() {
    std::env::remove_var("OPENAI_API_KEY");
    let err = build_model(
        Provider::OpenAi,
        "gpt-4",
        None,
        "https://api.openai.com",
        "http://localhost:11434",
        GenerationConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, FlowError::MissingConfigError { field } if field == "api_key"));
}

#[test]
fn test_build_model_ollama_needs_no_key() {
    let model = build_model(
        Provider::Ollama,
        "llama3",
        None,
        "https://api.openai.com",
        "http://localhost:11434",
        GenerationConfig::default(),
    )
    .unwrap();
    assert_eq!(model.describe(), "ollama:llama3");
}

#[tokio::test]
async fn test_list_ollama_models() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/api/tags");
        then.status(200).json_body(serde_json::json!({
            "models": [
                {"name": "llama3:latest", "size": 4000000000u64},
                {"name": "nomic-embed-text", "size": 270000000u64}
            ]
        }));
    });

    let names = list_ollama_models(&server.base_url()).await;
    mock.assert();
    assert_eq!(names, vec!["llama3:latest", "nomic-embed-text"]);
}

#[tokio::test]
async fn test_list_ollama_models_daemon_down() {
    // Nothing listens on this port; the listing degrades to empty.
    let names = list_ollama_models("http://127.0.0.1:9").await;
    assert!(names.is_empty());
}

#[tokio::test]
async fn test_ollama_embedder_batches() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/embed")
            .body_contains("nomic-embed-text");
        then.status(200).json_body(serde_json::json!({
            "embeddings": [[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]]
        }));
    });

    let embedder = OllamaEmbedder::new(&server.base_url(), "nomic-embed-text").unwrap();
    let vectors = embedder
        .embed(&["first".to_string(), "second".to_string()])
        .await
        .unwrap();

    mock.assert();
    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[0].len(), 3);
}

#[tokio::test]
async fn test_ollama_embedder_count_mismatch() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/embed");
        then.status(200)
            .json_body(serde_json::json!({"embeddings": [[0.1]]}));
    });

    let embedder = OllamaEmbedder::new(&server.base_url(), "nomic-embed-text").unwrap();
    let err = embedder
        .embed(&["first".to_string(), "second".to_string()])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("mismatch"));
}

pub mod chat;
pub mod embeddings;

pub use chat::ChatClient;
pub use embeddings::{HashEmbedder, OllamaEmbedder};

use crate::domain::ports::LanguageModel;
use crate::utils::error::{FlowError, Result};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Ollama,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAi => write!(f, "openai"),
            Provider::Ollama => write!(f, "ollama"),
        }
    }
}

impl FromStr for Provider {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "ollama" => Ok(Provider::Ollama),
            other => Err(FlowError::InvalidConfigValueError {
                field: "provider".to_string(),
                value: other.to_string(),
                reason: "supported providers are 'openai' and 'ollama'".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1500,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelOption {
    pub id: String,
    pub name: String,
    pub provider: Provider,
}

/// Static catalog of hosted chat models offered in the UI.
pub fn openai_model_options() -> Vec<ModelOption> {
    [
        ("gpt-3.5-turbo", "GPT-3.5 Turbo"),
        ("gpt-4", "GPT-4"),
        ("gpt-4-turbo", "GPT-4 Turbo"),
    ]
    .into_iter()
    .map(|(id, name)| ModelOption {
        id: id.to_string(),
        name: name.to_string(),
        provider: Provider::OpenAi,
    })
    .collect()
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

/// List locally installed Ollama models. A daemon that is not running is
/// not an error here; callers get an empty list and a log line.
pub async fn list_ollama_models(base_url: &str) -> Vec<String> {
    let url = format!("{}/api/tags", base_url.trim_end_matches('/'));
    let client = reqwest::Client::new();
    let response = client
        .get(&url)
        .timeout(Duration::from_secs(2))
        .send()
        .await;
    match response {
        Ok(resp) if resp.status().is_success() => match resp.json::<TagsResponse>().await {
            Ok(tags) => tags.models.into_iter().map(|m| m.name).collect(),
            Err(e) => {
                tracing::warn!("Unexpected response from Ollama at {}: {}", url, e);
                Vec::new()
            }
        },
        Ok(resp) => {
            tracing::warn!("Ollama at {} answered with status {}", url, resp.status());
            Vec::new()
        }
        Err(e) => {
            tracing::warn!("Error connecting to Ollama at {}: {}", url, e);
            Vec::new()
        }
    }
}

/// Build a chat model for the configured provider. OpenAI requires an API
/// key (argument first, `OPENAI_API_KEY` environment second); Ollama runs
/// locally without one.
pub fn build_model(
    provider: Provider,
    model_id: &str,
    api_key: Option<String>,
    openai_base_url: &str,
    ollama_base_url: &str,
    config: GenerationConfig,
) -> Result<Arc<dyn LanguageModel>> {
    tracing::info!("Creating LLM instance for provider: {}, model: {}", provider, model_id);
    match provider {
        Provider::OpenAi => {
            let key = api_key
                .filter(|k| !k.trim().is_empty())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .ok_or_else(|| FlowError::MissingConfigError {
                    field: "api_key".to_string(),
                })?;
            Ok(Arc::new(
                ChatClient::openai(model_id, key, openai_base_url)?.with_config(config),
            ))
        }
        Provider::Ollama => Ok(Arc::new(
            ChatClient::ollama(model_id, ollama_base_url)?.with_config(config),
        )),
    }
}

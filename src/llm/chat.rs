use crate::domain::ports::LanguageModel;
use crate::llm::{GenerationConfig, Provider};
use crate::utils::error::{FlowError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Chat-completions client speaking the OpenAI wire format. Ollama exposes
/// the same `/v1/chat/completions` surface, so one client covers both
/// providers; only the base URL and auth differ.
#[derive(Debug)]
pub struct ChatClient {
    provider: Provider,
    base_url: String,
    api_key: Option<String>,
    model: String,
    config: GenerationConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl ChatClient {
    pub fn openai(model: &str, api_key: String, base_url: &str) -> Result<Self> {
        Self::build(Provider::OpenAi, base_url, Some(api_key), model)
    }

    pub fn ollama(model: &str, base_url: &str) -> Result<Self> {
        Self::build(Provider::Ollama, base_url, None, model)
    }

    fn build(
        provider: Provider,
        base_url: &str,
        api_key: Option<String>,
        model: &str,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(300))
            .build()?;
        Ok(Self {
            provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            config: GenerationConfig::default(),
            client,
        })
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

#[async_trait]
impl LanguageModel for ChatClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let endpoint = self.endpoint();
        let request = json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "stream": false
        });

        tracing::debug!("Sending prompt ({} chars) to {}", prompt.len(), endpoint);
        let mut builder = self.client.post(&endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FlowError::LlmError {
                provider: self.provider.to_string(),
                message: format!("API error ({}): {}", status, body),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| FlowError::LlmError {
                provider: self.provider.to_string(),
                message: "response contained an empty choices array".to_string(),
            })
    }

    fn describe(&self) -> String {
        format!("{}:{}", self.provider, self.model)
    }
}

use crate::domain::ports::EmbeddingProvider;
use crate::retrieval::store::l2_normalize;
use crate::utils::error::{FlowError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Batch embedder backed by a local Ollama daemon.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/api/embed", self.base_url);
        let request = EmbedRequest {
            model: self.model.as_str(),
            input: texts,
        };
        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FlowError::LlmError {
                provider: "ollama".to_string(),
                message: format!("embedding request failed ({}): {}", status, body),
            });
        }
        let parsed: EmbedResponse = response.json().await?;
        if parsed.embeddings.len() != texts.len() {
            return Err(FlowError::ProcessingError {
                message: format!(
                    "embedding count mismatch: sent {} texts, got {} vectors",
                    texts.len(),
                    parsed.embeddings.len()
                ),
            });
        }
        Ok(parsed.embeddings)
    }
}

/// Deterministic byte-histogram embedder. No model, no network; useful when
/// no Ollama daemon is available and in tests.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self { dim: 256 }
    }
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0f32; self.dim];
                for &b in text.as_bytes() {
                    v[(b as usize) % self.dim] += 1.0;
                }
                l2_normalize(v)
            })
            .collect())
    }
}

use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Optional TOML configuration file. Every field can be omitted; CLI flags
/// take precedence over file values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    pub model: Option<ModelSection>,
    pub search: Option<SearchSection>,
    pub retrieval: Option<RetrievalSection>,
    pub output: Option<OutputSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelSection {
    pub provider: Option<String>,
    pub id: Option<String>,
    pub api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub ollama_base_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchSection {
    pub base_url: Option<String>,
    pub domain: Option<String>,
    pub max_results: Option<usize>,
    pub query_delay_ms: Option<u64>,
    pub fetch_timeout_seconds: Option<u64>,
    pub concurrent_requests: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalSection {
    /// "ollama" (default) or "hash" for the offline embedder.
    pub embedding: Option<String>,
    pub embedding_model: Option<String>,
    pub num_results: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSection {
    pub data_dir: Option<String>,
    pub archive: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

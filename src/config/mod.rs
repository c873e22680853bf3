pub mod settings;

use crate::llm::{GenerationConfig, Provider};
use crate::utils::error::{FlowError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, validate_url, Validate,
};
use clap::{Args, Parser, Subcommand};
use settings::FileConfig;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "research-flow")]
#[command(about = "Multi-agent research assistant: plan, search arXiv, summarize, report")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full research workflow for a topic
    Run(RunArgs),
    /// List available models for a provider
    Models(ModelsArgs),
    /// Query the persisted knowledge base
    Query(QueryArgs),
    /// Validate a pip-style dependency manifest
    Manifest(ManifestArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Research topic keywords, e.g. "artificial intelligence ethics"
    #[arg(long)]
    pub topic: String,

    /// Model provider: openai or ollama
    #[arg(long)]
    pub provider: Option<String>,

    /// Model id, e.g. gpt-4 or llama3
    #[arg(long)]
    pub model: Option<String>,

    /// OpenAI API key (falls back to OPENAI_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Directory for run artifacts
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Optional TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Total search-result budget across all plan queries
    #[arg(long)]
    pub max_results: Option<usize>,

    /// Parallel abstract-generation workers
    #[arg(long)]
    pub concurrent_requests: Option<usize>,

    /// Bundle run artifacts into a ZIP afterwards
    #[arg(long)]
    pub archive: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[derive(Debug, Args)]
pub struct ModelsArgs {
    /// Provider to list models for: openai or ollama
    #[arg(long, default_value = "ollama")]
    pub provider: String,

    #[arg(long)]
    pub ollama_base_url: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Query text
    #[arg(long)]
    pub text: String,

    #[arg(long)]
    pub data_dir: Option<String>,

    #[arg(long)]
    pub num_results: Option<usize>,

    /// Embedding backend the knowledge base was built with: ollama or hash
    #[arg(long)]
    pub embedding: Option<String>,

    #[arg(long)]
    pub embedding_model: Option<String>,

    #[arg(long)]
    pub ollama_base_url: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[derive(Debug, Args)]
pub struct ManifestArgs {
    /// Path to the manifest file (requirements.txt format)
    pub path: PathBuf,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingKind {
    Ollama,
    Hash,
}

impl FromStr for EmbeddingKind {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ollama" => Ok(EmbeddingKind::Ollama),
            "hash" => Ok(EmbeddingKind::Hash),
            other => Err(FlowError::InvalidConfigValueError {
                field: "embedding".to_string(),
                value: other.to_string(),
                reason: "supported embedding backends are 'ollama' and 'hash'".to_string(),
            }),
        }
    }
}

/// Fully resolved settings for a workflow run: CLI flags over file values
/// over defaults.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub topic: String,
    pub provider: Provider,
    pub model_id: String,
    pub api_key: Option<String>,
    pub openai_base_url: String,
    pub ollama_base_url: String,
    pub generation: GenerationConfig,
    pub search_base_url: String,
    pub search_domain: String,
    pub max_results: usize,
    pub query_delay: Duration,
    pub fetch_timeout: Duration,
    pub concurrent_requests: usize,
    pub embedding: EmbeddingKind,
    pub embedding_model: String,
    pub rag_num_results: usize,
    pub data_dir: PathBuf,
    pub archive: bool,
}

impl RunSettings {
    pub fn resolve(args: &RunArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        let model = file.model.unwrap_or_default();
        let search = file.search.unwrap_or_default();
        let retrieval = file.retrieval.unwrap_or_default();
        let output = file.output.unwrap_or_default();

        let provider: Provider = args
            .provider
            .clone()
            .or(model.provider)
            .unwrap_or_else(|| "openai".to_string())
            .parse()?;

        let model_id = match args.model.clone().or(model.id) {
            Some(id) => id,
            None => match provider {
                Provider::OpenAi => "gpt-3.5-turbo".to_string(),
                // There is no sensible default for a local install; the user
                // picks one from `research-flow models`.
                Provider::Ollama => {
                    return Err(FlowError::MissingConfigError {
                        field: "model".to_string(),
                    })
                }
            },
        };

        let defaults = GenerationConfig::default();
        Ok(Self {
            topic: args.topic.clone(),
            provider,
            model_id,
            api_key: args.api_key.clone().or(model.api_key),
            openai_base_url: model
                .openai_base_url
                .unwrap_or_else(|| crate::llm::DEFAULT_OPENAI_BASE_URL.to_string()),
            ollama_base_url: model
                .ollama_base_url
                .unwrap_or_else(|| crate::llm::DEFAULT_OLLAMA_BASE_URL.to_string()),
            generation: GenerationConfig {
                temperature: model.temperature.unwrap_or(defaults.temperature),
                max_tokens: model.max_tokens.unwrap_or(defaults.max_tokens),
            },
            search_base_url: search
                .base_url
                .unwrap_or_else(|| crate::adapters::search::DEFAULT_SEARCH_BASE_URL.to_string()),
            search_domain: search
                .domain
                .unwrap_or_else(|| crate::agents::search::DEFAULT_SEARCH_DOMAIN.to_string()),
            max_results: args
                .max_results
                .or(search.max_results)
                .unwrap_or(crate::agents::search::DEFAULT_MAX_RESULTS),
            query_delay: search
                .query_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(crate::agents::search::DEFAULT_QUERY_DELAY),
            fetch_timeout: search
                .fetch_timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(crate::agents::search::DEFAULT_FETCH_TIMEOUT),
            concurrent_requests: args
                .concurrent_requests
                .or(search.concurrent_requests)
                .unwrap_or(5),
            embedding: retrieval
                .embedding
                .as_deref()
                .unwrap_or("ollama")
                .parse()?,
            embedding_model: retrieval
                .embedding_model
                .unwrap_or_else(|| crate::llm::embeddings::DEFAULT_EMBEDDING_MODEL.to_string()),
            rag_num_results: retrieval
                .num_results
                .unwrap_or(crate::agents::rag::DEFAULT_NUM_RESULTS),
            data_dir: PathBuf::from(
                args.data_dir
                    .clone()
                    .or(output.data_dir)
                    .unwrap_or_else(|| "data".to_string()),
            ),
            archive: args.archive || output.archive.unwrap_or(false),
        })
    }
}

impl Validate for RunSettings {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("topic", &self.topic)?;
        validate_non_empty_string("model", &self.model_id)?;
        validate_url("search_base_url", &self.search_base_url)?;
        validate_non_empty_string("search_domain", &self.search_domain)?;
        validate_url("openai_base_url", &self.openai_base_url)?;
        validate_url("ollama_base_url", &self.ollama_base_url)?;
        validate_positive_number("max_results", self.max_results, 1)?;
        validate_positive_number("concurrent_requests", self.concurrent_requests, 1)?;
        validate_positive_number("rag_num_results", self.rag_num_results, 1)?;
        validate_range("temperature", self.generation.temperature, 0.0, 2.0)?;
        Ok(())
    }
}

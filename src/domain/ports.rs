use crate::domain::model::SearchHit;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[async_trait]
pub trait LanguageModel: Send + Sync + std::fmt::Debug {
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Human-readable provider/model identifier for logs.
    fn describe(&self) -> String;
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts; one vector per input, in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

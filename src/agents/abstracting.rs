use crate::domain::model::AbstractRecord;
use crate::domain::ports::{LanguageModel, Storage};
use crate::utils::error::Result;
use std::sync::Arc;

pub const DEFAULT_MAX_WORDS: usize = 200;
// Keep prompts inside a conservative context budget.
const MAX_CONTENT_CHARS: usize = 10_000;

pub struct AbstractAgent<S: Storage> {
    llm: Arc<dyn LanguageModel>,
    storage: S,
    max_words: usize,
}

impl<S: Storage> AbstractAgent<S> {
    pub fn new(llm: Arc<dyn LanguageModel>, storage: S) -> Self {
        tracing::info!("Initializing AbstractAgent with model: {}", llm.describe());
        Self {
            llm,
            storage,
            max_words: DEFAULT_MAX_WORDS,
        }
    }

    pub async fn generate_abstract(
        &self,
        article_content: &str,
        article_title: &str,
    ) -> Result<String> {
        tracing::info!("Generating abstract...");
        let truncated;
        let content = if article_content.chars().count() > MAX_CONTENT_CHARS {
            truncated = article_content
                .chars()
                .take(MAX_CONTENT_CHARS)
                .collect::<String>()
                + "...";
            truncated.as_str()
        } else {
            article_content
        };

        let prompt = format!(
            r#"Article Title: {title}

Article Content:
{content}

Please provide a concise academic abstract of the above article content in no more than {max_words} words.
Focus on the main findings, methodology, and implications.
The abstract should be informative and self-contained, allowing readers to quickly understand
the key points of the article without reading the full text.

Abstract:"#,
            title = article_title,
            content = content,
            max_words = self.max_words,
        );

        let response = self.llm.generate(&prompt).await?;
        let abstract_text = response.trim().to_string();
        tracing::info!("Abstract generated ({} characters)", abstract_text.len());
        Ok(abstract_text)
    }

    /// Read one saved article file and summarize it. Failures become an
    /// error-bearing record so one bad article cannot sink the batch.
    pub async fn process_article_file(&self, file_path: &str) -> AbstractRecord {
        tracing::info!("Processing article file: {}", file_path);
        match self.try_process(file_path).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!("Error processing article file {}: {}", file_path, e);
                AbstractRecord {
                    file_path: file_path.to_string(),
                    title: String::new(),
                    abstract_text: format!("Error processing article: {}", e),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn try_process(&self, file_path: &str) -> Result<AbstractRecord> {
        let bytes = self.storage.read_file(file_path).await?;
        let content = String::from_utf8_lossy(&bytes).to_string();

        // The saved files start with "Title:" and "URL:" header lines.
        let title = content
            .lines()
            .find_map(|line| line.strip_prefix("Title:"))
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        let lines: Vec<&str> = content.lines().collect();
        let article_content = if lines.len() >= 3 {
            lines[3..].join("\n")
        } else {
            content.clone()
        };

        let abstract_text = self.generate_abstract(&article_content, &title).await?;
        Ok(AbstractRecord {
            file_path: file_path.to_string(),
            title,
            abstract_text,
            error: None,
        })
    }
}

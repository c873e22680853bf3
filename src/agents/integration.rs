use crate::domain::model::{Article, ArticleContent, ResearchPlan};
use crate::domain::ports::Storage;
use crate::utils::error::{FlowError, Result};
use chrono::Local;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use zip::write::{FileOptions, ZipWriter};

const CSV_COLUMNS: [&str; 5] = ["title", "url", "source", "query", "snippet"];

pub struct IntegrationAgent<S: Storage> {
    storage: S,
    data_dir: PathBuf,
}

impl<S: Storage> IntegrationAgent<S> {
    pub fn new(storage: S, data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { storage, data_dir })
    }

    /// Absolute-ish path for user-facing output.
    pub fn display_path(&self, file_name: &str) -> String {
        self.data_dir.join(file_name).display().to_string()
    }

    /// Write the collected articles to a timestamped CSV. Returns the file
    /// name within the data dir.
    pub async fn save_articles_to_csv(&self, articles: &[Article], topic: &str) -> Result<String> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let file_name = format!("{}_{}.csv", sanitize_topic(topic), timestamp);

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_COLUMNS)?;
        for article in articles {
            writer.write_record([
                article.title.as_str(),
                article.url.as_str(),
                article.source.as_str(),
                article.query.as_str(),
                article.snippet.as_str(),
            ])?;
        }
        let bytes = writer.into_inner().map_err(|e| FlowError::ProcessingError {
            message: format!("CSV buffer error: {}", e),
        })?;

        self.storage.write_file(&file_name, &bytes).await?;
        tracing::info!("Saved {} articles to {}", articles.len(), file_name);
        Ok(file_name)
    }

    /// Save each fetched article body to its own text file, skipping
    /// empty-content records. Returns a URL → file-name map.
    pub async fn download_article_content(
        &self,
        articles: &[Article],
        contents: &[ArticleContent],
    ) -> Result<HashMap<String, String>> {
        let mut url_to_filepath = HashMap::new();
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();

        for (i, content) in contents.iter().enumerate() {
            if content.content_length == 0 {
                continue;
            }
            let title = articles.get(i).map(|a| a.title.as_str()).unwrap_or_default();
            let file_name = format!("article_{}_{}_{}.txt", i, timestamp, sanitize_title(title));
            let body = format!(
                "Title: {}\nURL: {}\n\n{}",
                content.title, content.url, content.content
            );
            self.storage.write_file(&file_name, body.as_bytes()).await?;
            url_to_filepath.insert(content.url.clone(), file_name);
        }
        tracing::info!("Saved {} article files", url_to_filepath.len());
        Ok(url_to_filepath)
    }

    /// Rewrite the CSV with a `local_filepath` column mapped from URLs.
    pub async fn update_csv_with_filepaths(
        &self,
        csv_name: &str,
        url_to_filepath: &HashMap<String, String>,
    ) -> Result<String> {
        let bytes = self.storage.read_file(csv_name).await?;
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers = reader.headers()?.clone();
        let url_idx = headers
            .iter()
            .position(|h| h == "url")
            .ok_or_else(|| FlowError::ProcessingError {
                message: format!("{} is missing a 'url' column", csv_name),
            })?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        let mut out_headers: Vec<String> = headers.iter().map(str::to_string).collect();
        out_headers.push("local_filepath".to_string());
        writer.write_record(&out_headers)?;

        for record in reader.records() {
            let record = record?;
            let url = record.get(url_idx).unwrap_or_default();
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.push(url_to_filepath.get(url).cloned().unwrap_or_default());
            writer.write_record(&row)?;
        }

        let out = writer.into_inner().map_err(|e| FlowError::ProcessingError {
            message: format!("CSV buffer error: {}", e),
        })?;
        self.storage.write_file(csv_name, &out).await?;
        Ok(csv_name.to_string())
    }

    /// Bundle the run's artifacts into one timestamped ZIP.
    pub async fn bundle_outputs(
        &self,
        final_csv: Option<&str>,
        report_file: Option<&str>,
        plan: Option<&ResearchPlan>,
    ) -> Result<String> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let bundle_name = format!("research_bundle_{}.zip", timestamp);

        let mut files: Vec<(String, Vec<u8>)> = Vec::new();
        for name in [final_csv, report_file].into_iter().flatten() {
            files.push((name.to_string(), self.storage.read_file(name).await?));
        }
        if let Some(plan) = plan {
            files.push((
                "research_plan.json".to_string(),
                serde_json::to_vec_pretty(plan)?,
            ));
        }

        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
            for (name, data) in &files {
                zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
                zip.write_all(data)?;
            }
            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        self.storage.write_file(&bundle_name, &zip_data).await?;
        tracing::info!("Bundled {} files into {}", files.len(), bundle_name);
        Ok(bundle_name)
    }
}

pub fn sanitize_topic(topic: &str) -> String {
    topic.replace(' ', "_").to_lowercase()
}

pub fn sanitize_title(title: &str) -> String {
    let prefix: String = title.chars().take(30).collect();
    prefix
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                FlowError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    fn sample_article(title: &str, url: &str) -> Article {
        Article {
            title: title.to_string(),
            url: url.to_string(),
            snippet: "snippet".to_string(),
            source: "arxiv.org".to_string(),
            query: "q".to_string(),
            pdf_url: None,
        }
    }

    fn agent(storage: MockStorage) -> IntegrationAgent<MockStorage> {
        let dir = tempfile::tempdir().unwrap();
        IntegrationAgent::new(storage, dir.path()).unwrap()
    }

    #[test]
    fn test_sanitize_topic() {
        assert_eq!(sanitize_topic("AI Ethics Today"), "ai_ethics_today");
    }

    #[test]
    fn test_sanitize_title() {
        assert_eq!(
            sanitize_title("Attention Is All You Need (v2)!"),
            "Attention_Is_All_You_Need_v2"
        );
        let long = "x".repeat(50);
        assert_eq!(sanitize_title(&long).len(), 30);
    }

    #[tokio::test]
    async fn test_save_articles_to_csv() {
        let storage = MockStorage::new();
        let agent = agent(storage.clone());
        let articles = vec![
            sample_article("First", "https://arxiv.org/abs/1"),
            sample_article("Second", "https://arxiv.org/abs/2"),
        ];

        let name = agent
            .save_articles_to_csv(&articles, "AI Ethics")
            .await
            .unwrap();
        assert!(name.starts_with("ai_ethics_"));
        assert!(name.ends_with(".csv"));

        let bytes = storage.get_file(&name).await.unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "title,url,source,query,snippet");
        assert!(text.contains("First"));
        assert!(text.contains("Second"));
    }

    #[tokio::test]
    async fn test_download_article_content_skips_empty() {
        let storage = MockStorage::new();
        let agent = agent(storage.clone());
        let articles = vec![
            sample_article("Has Content", "https://arxiv.org/abs/1"),
            sample_article("No Content", "https://arxiv.org/abs/2"),
        ];
        let contents = vec![
            ArticleContent {
                title: "Has Content".to_string(),
                url: "https://arxiv.org/abs/1".to_string(),
                content: "body text".to_string(),
                content_length: 9,
                error: None,
            },
            ArticleContent {
                title: String::new(),
                url: "https://arxiv.org/abs/2".to_string(),
                content: String::new(),
                content_length: 0,
                error: Some("timeout".to_string()),
            },
        ];

        let map = agent
            .download_article_content(&articles, &contents)
            .await
            .unwrap();
        assert_eq!(map.len(), 1);
        let file_name = map.get("https://arxiv.org/abs/1").unwrap();
        let body = String::from_utf8(storage.get_file(file_name).await.unwrap()).unwrap();
        assert!(body.starts_with("Title: Has Content\nURL: https://arxiv.org/abs/1\n\n"));
        assert!(body.ends_with("body text"));
    }

    #[tokio::test]
    async fn test_update_csv_with_filepaths() {
        let storage = MockStorage::new();
        let agent = agent(storage.clone());
        let articles = vec![sample_article("First", "https://arxiv.org/abs/1")];
        let csv_name = agent.save_articles_to_csv(&articles, "t").await.unwrap();

        let mut map = HashMap::new();
        map.insert(
            "https://arxiv.org/abs/1".to_string(),
            "article_0_x_First.txt".to_string(),
        );
        agent
            .update_csv_with_filepaths(&csv_name, &map)
            .await
            .unwrap();

        let text = String::from_utf8(storage.get_file(&csv_name).await.unwrap()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "title,url,source,query,snippet,local_filepath"
        );
        assert!(lines.next().unwrap().ends_with("article_0_x_First.txt"));
    }

    #[tokio::test]
    async fn test_bundle_outputs_contents() {
        let storage = MockStorage::new();
        storage.write_file("final.csv", b"title\n").await.unwrap();
        storage.write_file("report.tex", b"\\documentclass{article}").await.unwrap();
        let agent = agent(storage.clone());

        let plan = ResearchPlan {
            topic: "t".to_string(),
            plan: Default::default(),
        };
        let bundle = agent
            .bundle_outputs(Some("final.csv"), Some("report.tex"), Some(&plan))
            .await
            .unwrap();

        let zip_bytes = storage.get_file(&bundle).await.unwrap();
        let cursor = std::io::Cursor::new(zip_bytes);
        let mut archive = zip::ZipArchive::new(cursor).unwrap();
        assert_eq!(archive.len(), 3);

        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["final.csv", "report.tex", "research_plan.json"]);
    }
}

use crate::agents::rag::RagAgent;
use crate::domain::model::{AbstractRecord, Article, ArticleStatus, ResearchReport};
use crate::domain::ports::Storage;
use crate::utils::error::{FlowError, Result};
use std::collections::{BTreeMap, HashMap};

const DETAIL_COLUMNS: [&str; 3] = ["abstract", "authors", "link"];

pub struct TransformationAgent<S: Storage> {
    storage: S,
}

impl<S: Storage> TransformationAgent<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Join generated abstracts into the CSV on the `local_filepath` column.
    pub async fn update_csv_with_abstracts(
        &self,
        csv_name: &str,
        abstracts: &[AbstractRecord],
    ) -> Result<String> {
        let file_to_abstract: HashMap<&str, &str> = abstracts
            .iter()
            .map(|a| (a.file_path.as_str(), a.abstract_text.as_str()))
            .collect();

        let bytes = self.storage.read_file(csv_name).await?;
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers = reader.headers()?.clone();
        let filepath_idx = headers
            .iter()
            .position(|h| h == "local_filepath")
            .ok_or_else(|| FlowError::ProcessingError {
                message: format!("{} is missing a 'local_filepath' column", csv_name),
            })?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        let mut out_headers: Vec<String> = headers.iter().map(str::to_string).collect();
        out_headers.push("abstract".to_string());
        writer.write_record(&out_headers)?;

        for record in reader.records() {
            let record = record?;
            let filepath = record.get(filepath_idx).unwrap_or_default();
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.push(
                file_to_abstract
                    .get(filepath)
                    .map(|a| a.to_string())
                    .unwrap_or_default(),
            );
            writer.write_record(&row)?;
        }

        let out = writer.into_inner().map_err(|e| FlowError::ProcessingError {
            message: format!("CSV buffer error: {}", e),
        })?;
        self.storage.write_file(csv_name, &out).await?;
        Ok(csv_name.to_string())
    }

    /// Produce the final detailed CSV. Rows still missing an abstract get
    /// their PDF indexed into the knowledge base (when a PDF URL is known)
    /// and the missing abstract/authors/link fields are answered from it.
    pub async fn fill_missing_details(
        &self,
        csv_name: &str,
        articles: &[Article],
        rag: &RagAgent<S>,
    ) -> Result<String> {
        let bytes = self.storage.read_file(csv_name).await?;
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers = reader.headers()?.clone();
        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.to_string(), i))
            .collect();
        let url_idx = *index.get("url").ok_or_else(|| FlowError::ProcessingError {
            message: format!("{} is missing a 'url' column", csv_name),
        })?;

        let mut out_headers: Vec<String> = headers.iter().map(str::to_string).collect();
        for column in DETAIL_COLUMNS {
            if !index.contains_key(column) {
                out_headers.push(column.to_string());
            }
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&out_headers)?;

        for record in reader.records() {
            let record = record?;
            let field = |name: &str| -> String {
                index
                    .get(name)
                    .and_then(|&i| record.get(i))
                    .unwrap_or_default()
                    .to_string()
            };
            let url = record.get(url_idx).unwrap_or_default().to_string();

            let mut abstract_val = field("abstract");
            if abstract_val.trim().is_empty() {
                if let Some(pdf_url) = articles
                    .iter()
                    .find(|a| a.url == url)
                    .and_then(|a| a.pdf_url.as_deref())
                {
                    if let Err(e) = rag
                        .extract_article_content(pdf_url, &article_id_from_url(&url))
                        .await
                    {
                        tracing::warn!("Could not index PDF {}: {}", pdf_url, e);
                    }
                }
                abstract_val = rag.retrieve_abstract(&url).await;
            }

            let mut authors_val = field("authors");
            if authors_val.trim().is_empty() {
                authors_val = rag.retrieve_authors(&url).await;
            }
            let mut link_val = field("link");
            if link_val.trim().is_empty() {
                link_val = rag.retrieve_link(&url).await;
            }

            let row: Vec<String> = out_headers
                .iter()
                .map(|h| match h.as_str() {
                    "abstract" => abstract_val.clone(),
                    "authors" => authors_val.clone(),
                    "link" => link_val.clone(),
                    other => index
                        .get(other)
                        .and_then(|&i| record.get(i))
                        .unwrap_or_default()
                        .to_string(),
                })
                .collect();
            writer.write_record(&row)?;
        }

        let out = writer.into_inner().map_err(|e| FlowError::ProcessingError {
            message: format!("CSV buffer error: {}", e),
        })?;
        let detailed_name = format!("{}_detailed.csv", csv_name.trim_end_matches(".csv"));
        self.storage.write_file(&detailed_name, &out).await?;
        tracing::info!("Detailed CSV saved to: {}", detailed_name);
        Ok(detailed_name)
    }

    pub async fn generate_summary_report(
        &self,
        csv_name: &str,
        topic: &str,
    ) -> Result<ResearchReport> {
        let bytes = self.storage.read_file(csv_name).await?;
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers = reader.headers()?.clone();
        let find = |name: &str| headers.iter().position(|h| h == name);
        let title_idx = find("title");
        let source_idx = find("source");
        let abstract_idx = find("abstract");

        let mut total_articles = 0;
        let mut articles_with_abstracts = 0;
        let mut sources: BTreeMap<String, usize> = BTreeMap::new();
        let mut articles = Vec::new();

        for record in reader.records() {
            let record = record?;
            total_articles += 1;

            let get = |idx: Option<usize>| -> &str {
                idx.and_then(|i| record.get(i)).unwrap_or_default()
            };
            let title = get(title_idx);
            let source = get(source_idx);
            let has_abstract = !get(abstract_idx).trim().is_empty();
            if has_abstract {
                articles_with_abstracts += 1;
            }
            if !source.is_empty() {
                *sources.entry(source.to_string()).or_insert(0) += 1;
            }
            articles.push(ArticleStatus {
                title: if title.is_empty() {
                    "Unknown Title".to_string()
                } else {
                    title.to_string()
                },
                source: if source.is_empty() {
                    "Unknown Source".to_string()
                } else {
                    source.to_string()
                },
                has_abstract,
            });
        }

        Ok(ResearchReport {
            topic: topic.to_string(),
            total_articles,
            articles_with_abstracts,
            sources,
            articles,
            csv_path: csv_name.to_string(),
        })
    }
}

fn article_id_from_url(url: &str) -> String {
    url.rsplit('/')
        .find(|part| !part.is_empty())
        .unwrap_or(url)
        .to_string()
}

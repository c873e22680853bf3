use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One search result after arXiv filtering and PDF-URL derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub source: String,
    pub query: String,
    pub pdf_url: Option<String>,
}

/// Raw hit coming back from the search engine, before any filtering.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Extracted page content for one article URL. Fetch failures produce an
/// empty-content record carrying the error instead of aborting the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleContent {
    pub title: String,
    pub url: String,
    pub content: String,
    pub content_length: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanDetails {
    #[serde(default)]
    pub subtopics: Vec<String>,
    #[serde(default)]
    pub search_queries: Vec<String>,
    #[serde(default)]
    pub expected_outcome: String,
    #[serde(default)]
    pub research_strategy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latex_report_plan: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchPlan {
    pub topic: String,
    pub plan: PlanDetails,
}

/// Abstract generated for one saved article file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbstractRecord {
    pub file_path: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleStatus {
    pub title: String,
    pub source: String,
    pub has_abstract: bool,
}

/// Summary statistics over the final CSV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchReport {
    pub topic: String,
    pub total_articles: usize,
    pub articles_with_abstracts: usize,
    pub sources: BTreeMap<String, usize>,
    pub articles: Vec<ArticleStatus>,
    pub csv_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatexReport {
    pub latex_document: String,
}

/// Text pulled out of a downloaded PDF.
#[derive(Debug, Clone)]
pub struct PdfContent {
    pub content: String,
    pub chars: usize,
}

use crate::domain::model::{LatexReport, ResearchPlan};
use crate::domain::ports::{LanguageModel, Storage};
use crate::utils::error::Result;
use std::sync::Arc;

pub const REPORT_FILE: &str = "academic_report.tex";

pub struct WritingAgent<S: Storage> {
    llm: Arc<dyn LanguageModel>,
    storage: S,
}

impl<S: Storage> WritingAgent<S> {
    pub fn new(llm: Arc<dyn LanguageModel>, storage: S) -> Self {
        tracing::info!("Initializing WritingAgent with model: {}", llm.describe());
        Self { llm, storage }
    }

    /// Compose a LaTeX report from the research plan and the final CSV.
    pub async fn write_report(
        &self,
        plan: &ResearchPlan,
        csv_name: &str,
    ) -> Result<LatexReport> {
        tracing::info!("Writing academic report...");
        let digest = self.article_digest(csv_name).await?;

        let mut sections = String::new();
        if let Some(latex_plan) = &plan.plan.latex_report_plan {
            for (section, points) in latex_plan {
                sections.push_str(&format!("- {}: {}\n", section, points.join("; ")));
            }
        }

        let prompt = format!(
            r#"Write a complete LaTeX academic report on the topic '{topic}'.

Research context:
Subtopics: {subtopics}
Expected outcome: {outcome}
{sections_block}
Articles reviewed:
{digest}

Requirements:
- A full LaTeX document starting with \documentclass and ending with \end{{document}}
- Title page, abstract, introduction, a literature review discussing the articles above,
  a discussion section, a conclusion, and a bibliography of the reviewed articles
- Formal academic register

Return only the LaTeX source."#,
            topic = plan.topic,
            subtopics = plan.plan.subtopics.join(", "),
            outcome = plan.plan.expected_outcome,
            sections_block = if sections.is_empty() {
                String::new()
            } else {
                format!("Planned report structure:\n{}\n", sections)
            },
            digest = digest,
        );

        let response = self.llm.generate(&prompt).await?;
        Ok(LatexReport {
            latex_document: strip_code_fences(&response),
        })
    }

    /// Persist the report under the data dir; returns the file name.
    pub async fn save_report(&self, report: &LatexReport) -> Result<String> {
        self.storage
            .write_file(REPORT_FILE, report.latex_document.as_bytes())
            .await?;
        Ok(REPORT_FILE.to_string())
    }

    /// One line per article with title, authors and abstract, for prompting.
    async fn article_digest(&self, csv_name: &str) -> Result<String> {
        let bytes = self.storage.read_file(csv_name).await?;
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let headers = reader.headers()?.clone();
        let find = |name: &str| headers.iter().position(|h| h == name);
        let title_idx = find("title");
        let authors_idx = find("authors");
        let abstract_idx = find("abstract");

        let mut digest = String::new();
        for record in reader.records() {
            let record = record?;
            let get = |idx: Option<usize>| -> &str {
                idx.and_then(|i| record.get(i)).unwrap_or_default()
            };
            let title = get(title_idx);
            if title.is_empty() {
                continue;
            }
            let authors = get(authors_idx);
            let abstract_text = get(abstract_idx);
            digest.push_str("- ");
            digest.push_str(title);
            if !authors.is_empty() {
                digest.push_str(&format!(" ({})", authors));
            }
            if !abstract_text.is_empty() {
                digest.push_str(": ");
                digest.push_str(abstract_text);
            }
            digest.push('\n');
        }
        if digest.is_empty() {
            digest.push_str("(no articles collected)\n");
        }
        Ok(digest)
    }
}

/// Strip a surrounding markdown code fence, `latex` language tag included.
fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let rest = rest.strip_prefix("latex").unwrap_or(rest);
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim().to_string()
}

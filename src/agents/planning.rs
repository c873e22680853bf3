use crate::domain::model::{PlanDetails, ResearchPlan};
use crate::domain::ports::LanguageModel;
use crate::utils::error::Result;
use std::sync::Arc;

pub struct PlanningAgent {
    llm: Arc<dyn LanguageModel>,
}

impl PlanningAgent {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        tracing::info!("Initializing PlanningAgent with model: {}", llm.describe());
        Self { llm }
    }

    /// Ask the model for a structured research plan. An unparseable reply
    /// degrades to a generic fallback plan instead of failing the run.
    pub async fn generate_plan(&self, topic: &str) -> Result<ResearchPlan> {
        tracing::info!("Generating research plan for topic: {}", topic);
        let prompt = format!(
            r#"I need to research the topic described by these keywords: '{topic}'.

Please provide:
1. A clear breakdown of subtopics to explore
2. At least 5 specific search queries that would help gather comprehensive information
3. A short description of the expected outcome of this research

Format your response as a JSON with the following structure:
{{
    "subtopics": ["subtopic1", "subtopic2", ...],
    "search_queries": ["query1", "query2", ...],
    "expected_outcome": "description of expected outcome",
    "research_strategy": "brief description of research strategy"
}}"#
        );

        let response = self.llm.generate(&prompt).await?;
        tracing::debug!("Raw planner response: {}", response);

        let details = match parse_plan_details(&response) {
            Some(details) if !details.search_queries.is_empty() => details,
            _ => {
                tracing::warn!("Planner reply was not valid JSON; using fallback plan");
                fallback_plan(topic)
            }
        };
        tracing::info!("Plan generated with {} search queries", details.search_queries.len());

        Ok(ResearchPlan {
            topic: topic.to_string(),
            plan: details,
        })
    }
}

/// Pull the first JSON object out of a model reply; code fences and
/// surrounding prose are tolerated.
fn parse_plan_details(response: &str) -> Option<PlanDetails> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&response[start..=end]).ok()
}

fn fallback_plan(topic: &str) -> PlanDetails {
    PlanDetails {
        subtopics: vec![format!("General {}", topic)],
        search_queries: vec![topic.to_string(), format!("latest research {}", topic)],
        expected_outcome: format!("General overview of {}", topic),
        research_strategy: "General search on the topic".to_string(),
        latex_report_plan: None,
    }
}

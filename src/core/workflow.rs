use crate::domain::model::{
    AbstractRecord, Article, ArticleContent, LatexReport, ResearchPlan, ResearchReport,
};
use crate::utils::error::{FlowError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Shared state threaded through the workflow, one field per stage output.
#[derive(Debug, Clone, Default)]
pub struct WorkflowState {
    pub topic: String,
    pub plan: Option<ResearchPlan>,
    pub articles: Vec<Article>,
    pub article_contents: Vec<ArticleContent>,
    pub csv_path: Option<String>,
    pub url_to_filepath: HashMap<String, String>,
    pub abstracts: Vec<AbstractRecord>,
    pub final_csv_path: Option<String>,
    pub report: Option<ResearchReport>,
    pub latex_report: Option<LatexReport>,
    pub report_path: Option<String>,
}

impl WorkflowState {
    pub fn new(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage_name: String,
    pub duration: Duration,
}

#[async_trait]
pub trait WorkflowStage: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, state: &mut WorkflowState) -> Result<()>;

    /// Stages may opt out based on the state accumulated so far.
    fn should_run(&self, _state: &WorkflowState) -> bool {
        true
    }
}

#[derive(Debug)]
pub struct WorkflowOutcome {
    pub state: WorkflowState,
    pub stages: Vec<StageReport>,
}

/// Executes registered stages in order against one shared state.
#[derive(Default)]
pub struct Workflow {
    stages: Vec<Box<dyn WorkflowStage>>,
}

impl Workflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stage(&mut self, stage: Box<dyn WorkflowStage>) {
        self.stages.push(stage);
    }

    pub async fn execute(&self, topic: &str) -> Result<WorkflowOutcome> {
        tracing::info!("🚀 Starting research workflow for topic: {}", topic);
        let mut state = WorkflowState::new(topic);
        let mut reports = Vec::new();

        for stage in &self.stages {
            if !stage.should_run(&state) {
                tracing::info!("⏭️ Skipping stage: {} (condition not met)", stage.name());
                continue;
            }
            let start = Instant::now();
            match stage.run(&mut state).await {
                Ok(()) => {
                    let report = StageReport {
                        stage_name: stage.name().to_string(),
                        duration: start.elapsed(),
                    };
                    tracing::info!(
                        "✅ Stage completed: {} ({:?})",
                        report.stage_name,
                        report.duration
                    );
                    reports.push(report);
                }
                Err(e) => {
                    tracing::error!("❌ Stage failed: {}: {}", stage.name(), e);
                    return Err(FlowError::StageError {
                        stage: stage.name().to_string(),
                        details: e.to_string(),
                    });
                }
            }
        }

        tracing::info!("🏁 Workflow execution completed");
        Ok(WorkflowOutcome {
            state,
            stages: reports,
        })
    }

    pub fn execution_summary(reports: &[StageReport]) -> HashMap<String, serde_json::Value> {
        let mut summary = HashMap::new();
        let total_duration: Duration = reports.iter().map(|r| r.duration).sum();
        summary.insert(
            "total_stages".to_string(),
            serde_json::Value::Number(reports.len().into()),
        );
        summary.insert(
            "total_duration_ms".to_string(),
            serde_json::Value::Number((total_duration.as_millis() as u64).into()),
        );
        summary.insert(
            "executed_stages".to_string(),
            serde_json::Value::Array(
                reports
                    .iter()
                    .map(|r| serde_json::Value::String(r.stage_name.clone()))
                    .collect(),
            ),
        );
        summary
    }
}

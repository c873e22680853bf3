use crate::agents::abstracting::AbstractAgent;
use crate::agents::integration::IntegrationAgent;
use crate::agents::planning::PlanningAgent;
use crate::agents::rag::RagAgent;
use crate::agents::search::SearchAgent;
use crate::agents::transformation::TransformationAgent;
use crate::agents::writing::WritingAgent;
use crate::core::workflow::{Workflow, WorkflowStage, WorkflowState};
use crate::domain::model::AbstractRecord;
use crate::domain::ports::{EmbeddingProvider, LanguageModel, SearchProvider, Storage};
use crate::utils::error::{FlowError, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub struct WorkflowOptions {
    pub data_dir: PathBuf,
    pub search_domain: String,
    pub max_results: usize,
    pub query_delay: Duration,
    pub fetch_timeout: Duration,
    pub concurrent_requests: usize,
    pub rag_num_results: usize,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            search_domain: crate::agents::search::DEFAULT_SEARCH_DOMAIN.to_string(),
            max_results: crate::agents::search::DEFAULT_MAX_RESULTS,
            query_delay: crate::agents::search::DEFAULT_QUERY_DELAY,
            fetch_timeout: crate::agents::search::DEFAULT_FETCH_TIMEOUT,
            concurrent_requests: 5,
            rag_num_results: crate::agents::rag::DEFAULT_NUM_RESULTS,
        }
    }
}

pub struct PlanningStage {
    agent: PlanningAgent,
}

#[async_trait]
impl WorkflowStage for PlanningStage {
    fn name(&self) -> &str {
        "planning"
    }

    async fn run(&self, state: &mut WorkflowState) -> Result<()> {
        tracing::info!("🎯 Starting Planning Step");
        let plan = self.agent.generate_plan(&state.topic).await?;
        tracing::debug!("Generated plan: {}", serde_json::to_string_pretty(&plan)?);
        state.plan = Some(plan);
        Ok(())
    }
}

pub struct SearchingStage {
    agent: SearchAgent,
}

#[async_trait]
impl WorkflowStage for SearchingStage {
    fn name(&self) -> &str {
        "searching"
    }

    async fn run(&self, state: &mut WorkflowState) -> Result<()> {
        tracing::info!("🔍 Starting Search Step");
        let plan = state.plan.as_ref().ok_or_else(|| FlowError::ProcessingError {
            message: "planning stage has not produced a plan".to_string(),
        })?;

        let articles = self.agent.search_articles(plan).await?;
        tracing::info!("Found {} articles", articles.len());

        let mut contents = Vec::with_capacity(articles.len());
        for (i, article) in articles.iter().enumerate() {
            tracing::info!(
                "Fetching content for article {}/{}: {}",
                i + 1,
                articles.len(),
                article.title
            );
            contents.push(self.agent.fetch_article_content(&article.url).await);
        }
        tracing::info!("Successfully fetched content for {} articles", contents.len());

        state.articles = articles;
        state.article_contents = contents;
        Ok(())
    }
}

pub struct IntegrationStage<S: Storage> {
    agent: IntegrationAgent<S>,
}

#[async_trait]
impl<S: Storage> WorkflowStage for IntegrationStage<S> {
    fn name(&self) -> &str {
        "integration"
    }

    async fn run(&self, state: &mut WorkflowState) -> Result<()> {
        tracing::info!("💾 Starting Integration Step");
        let topic = state
            .plan
            .as_ref()
            .map(|p| p.topic.clone())
            .unwrap_or_else(|| state.topic.clone());

        let csv_name = self
            .agent
            .save_articles_to_csv(&state.articles, &topic)
            .await?;
        let url_to_filepath = self
            .agent
            .download_article_content(&state.articles, &state.article_contents)
            .await?;
        self.agent
            .update_csv_with_filepaths(&csv_name, &url_to_filepath)
            .await?;
        tracing::info!("Articles processed and saved to: {}", csv_name);

        state.csv_path = Some(csv_name);
        state.url_to_filepath = url_to_filepath;
        Ok(())
    }
}

pub struct AbstractingStage<S: Storage> {
    agent: Arc<AbstractAgent<S>>,
    max_concurrent: usize,
}

#[async_trait]
impl<S: Storage + 'static> WorkflowStage for AbstractingStage<S> {
    fn name(&self) -> &str {
        "abstracting"
    }

    fn should_run(&self, state: &WorkflowState) -> bool {
        !state.url_to_filepath.is_empty()
    }

    async fn run(&self, state: &mut WorkflowState) -> Result<()> {
        tracing::info!("📝 Starting Abstract Generation Step");
        let files: Vec<String> = state
            .url_to_filepath
            .values()
            .filter(|p| !p.is_empty())
            .cloned()
            .collect();
        tracing::info!("Processing {} articles for abstract generation", files.len());

        let abstracts: Vec<AbstractRecord> = stream::iter(files.into_iter().map(|path| {
            let agent = self.agent.clone();
            async move { agent.process_article_file(&path).await }
        }))
        .buffer_unordered(self.max_concurrent.max(1))
        .collect()
        .await;

        tracing::info!(
            "Completed abstract generation for {} articles",
            abstracts.len()
        );
        state.abstracts = abstracts;
        Ok(())
    }
}

pub struct TransformationStage<S: Storage> {
    agent: TransformationAgent<S>,
    rag: Arc<RagAgent<S>>,
}

#[async_trait]
impl<S: Storage> WorkflowStage for TransformationStage<S> {
    fn name(&self) -> &str {
        "transformation"
    }

    async fn run(&self, state: &mut WorkflowState) -> Result<()> {
        tracing::info!("🔄 Starting Transformation Step");
        let csv_name = state
            .csv_path
            .clone()
            .ok_or_else(|| FlowError::ProcessingError {
                message: "integration stage has not produced a CSV".to_string(),
            })?;

        self.agent
            .update_csv_with_abstracts(&csv_name, &state.abstracts)
            .await?;
        let detailed = self
            .agent
            .fill_missing_details(&csv_name, &state.articles, &self.rag)
            .await?;
        let report = self
            .agent
            .generate_summary_report(&detailed, &state.topic)
            .await?;

        state.final_csv_path = Some(detailed);
        state.report = Some(report);
        Ok(())
    }
}

pub struct WritingStage<S: Storage> {
    agent: WritingAgent<S>,
}

#[async_trait]
impl<S: Storage> WorkflowStage for WritingStage<S> {
    fn name(&self) -> &str {
        "writing"
    }

    async fn run(&self, state: &mut WorkflowState) -> Result<()> {
        tracing::info!("📝 Starting Writing Step");
        let plan = state.plan.as_ref().ok_or_else(|| FlowError::ProcessingError {
            message: "planning stage has not produced a plan".to_string(),
        })?;
        let csv_name = state
            .final_csv_path
            .as_deref()
            .ok_or_else(|| FlowError::ProcessingError {
                message: "transformation stage has not produced a final CSV".to_string(),
            })?;

        let latex_report = self.agent.write_report(plan, csv_name).await?;
        let report_name = self.agent.save_report(&latex_report).await?;
        tracing::info!("LaTeX report saved to: {}", report_name);

        state.latex_report = Some(latex_report);
        state.report_path = Some(report_name);
        Ok(())
    }
}

/// Assemble the six-stage research workflow over one storage backend.
/// Returns the workflow together with the shared RAG agent so callers can
/// restore a persisted knowledge base before executing.
pub fn build_research_workflow<S>(
    llm: Arc<dyn LanguageModel>,
    search_provider: Arc<dyn SearchProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    storage: S,
    options: &WorkflowOptions,
) -> Result<(Workflow, Arc<RagAgent<S>>)>
where
    S: Storage + Clone + 'static,
{
    let rag = Arc::new(
        RagAgent::new(storage.clone(), embedder)?.with_num_results(options.rag_num_results),
    );

    let mut workflow = Workflow::new();
    workflow.add_stage(Box::new(PlanningStage {
        agent: PlanningAgent::new(llm.clone()),
    }));
    workflow.add_stage(Box::new(SearchingStage {
        agent: SearchAgent::new(
            search_provider,
            &options.search_domain,
            options.max_results,
            options.query_delay,
            options.fetch_timeout,
        )?,
    }));
    workflow.add_stage(Box::new(IntegrationStage {
        agent: IntegrationAgent::new(storage.clone(), options.data_dir.clone())?,
    }));
    workflow.add_stage(Box::new(AbstractingStage {
        agent: Arc::new(AbstractAgent::new(llm.clone(), storage.clone())),
        max_concurrent: options.concurrent_requests,
    }));
    workflow.add_stage(Box::new(TransformationStage {
        agent: TransformationAgent::new(storage.clone()),
        rag: rag.clone(),
    }));
    workflow.add_stage(Box::new(WritingStage {
        agent: WritingAgent::new(llm, storage),
    }));

    Ok((workflow, rag))
}

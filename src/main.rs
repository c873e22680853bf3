use clap::Parser;
use research_flow::agents::IntegrationAgent;
use research_flow::agents::RagAgent;
use research_flow::config::{
    Cli, Command, EmbeddingKind, ManifestArgs, ModelsArgs, QueryArgs, RunArgs, RunSettings,
};
use research_flow::core::{build_research_workflow, Workflow, WorkflowOptions};
use research_flow::domain::ports::EmbeddingProvider;
use research_flow::llm::{self, HashEmbedder, OllamaEmbedder, Provider};
use research_flow::manifest::Manifest;
use research_flow::utils::validation::Validate;
use research_flow::utils::logger;
use research_flow::{DuckDuckGoClient, LocalStorage, WorkflowOutcome};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run(args).await,
        Command::Models(args) => models(args).await,
        Command::Query(args) => query(args).await,
        Command::Manifest(args) => manifest(args),
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    logger::init_cli_logger(args.verbose);
    tracing::info!("Starting research-flow CLI");

    let settings = match RunSettings::resolve(&args) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };
    if args.verbose {
        tracing::debug!("Run settings: {:?}", settings);
    }
    if let Err(e) = settings.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let llm = llm::build_model(
        settings.provider,
        &settings.model_id,
        settings.api_key.clone(),
        &settings.openai_base_url,
        &settings.ollama_base_url,
        settings.generation.clone(),
    )?;
    let search_provider = Arc::new(DuckDuckGoClient::new(&settings.search_base_url)?);
    let embedder: Arc<dyn EmbeddingProvider> = match settings.embedding {
        EmbeddingKind::Ollama => Arc::new(OllamaEmbedder::new(
            &settings.ollama_base_url,
            &settings.embedding_model,
        )?),
        EmbeddingKind::Hash => Arc::new(HashEmbedder::default()),
    };
    let storage = LocalStorage::new(settings.data_dir.clone());

    let options = WorkflowOptions {
        data_dir: settings.data_dir.clone(),
        search_domain: settings.search_domain.clone(),
        max_results: settings.max_results,
        query_delay: settings.query_delay,
        fetch_timeout: settings.fetch_timeout,
        concurrent_requests: settings.concurrent_requests,
        rag_num_results: settings.rag_num_results,
    };
    let (workflow, rag) =
        build_research_workflow(llm, search_provider, embedder, storage.clone(), &options)?;
    if rag.load_persisted().await? {
        tracing::info!("Restored persisted knowledge base");
    }

    match workflow.execute(&settings.topic).await {
        Ok(outcome) => {
            let summary = Workflow::execution_summary(&outcome.stages);
            tracing::info!("📊 Execution summary: {:?}", summary);
            print_results(&outcome, &settings);

            if settings.archive {
                let bundler = IntegrationAgent::new(storage, settings.data_dir.clone())?;
                let bundle = bundler
                    .bundle_outputs(
                        outcome.state.final_csv_path.as_deref(),
                        outcome.state.report_path.as_deref(),
                        outcome.state.plan.as_ref(),
                    )
                    .await?;
                println!("📦 Artifacts bundled: {}", bundler.display_path(&bundle));
            }
        }
        Err(e) => {
            tracing::error!("❌ Research workflow failed: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}

fn print_results(outcome: &WorkflowOutcome, settings: &RunSettings) {
    let state = &outcome.state;
    println!("✅ Research completed successfully!");

    if let Some(plan) = &state.plan {
        println!("\n1. Research Plan: {}", plan.topic);
        if !plan.plan.subtopics.is_empty() {
            println!("   Subtopics:");
            for subtopic in &plan.plan.subtopics {
                println!("   - {}", subtopic);
            }
        }
        if !plan.plan.search_queries.is_empty() {
            println!("   Search queries:");
            for query in &plan.plan.search_queries {
                println!("   - {}", query);
            }
        }
        if !plan.plan.expected_outcome.is_empty() {
            println!("   Expected outcome: {}", plan.plan.expected_outcome);
        }
    }

    println!("\n2. Search Results: {} articles", state.articles.len());
    for article in &state.articles {
        println!("   - {} ({})", article.title, article.url);
    }

    if let Some(report) = &state.report {
        println!("\n3. Research Statistics");
        println!("   Total articles: {}", report.total_articles);
        println!(
            "   Articles with abstracts: {}",
            report.articles_with_abstracts
        );
        println!("   Sources: {}", report.sources.len());
    }

    let display = |name: &str| settings.data_dir.join(name).display().to_string();
    if let Some(csv) = &state.final_csv_path {
        println!("\n📁 Final CSV: {}", display(csv));
    }
    if let Some(tex) = &state.report_path {
        println!("📁 LaTeX report: {}", display(tex));
    }
}

async fn models(args: ModelsArgs) -> anyhow::Result<()> {
    logger::init_cli_logger(args.verbose);
    let provider: Provider = args.provider.parse()?;
    match provider {
        Provider::OpenAi => {
            for option in llm::openai_model_options() {
                println!("{}  ({})", option.id, option.name);
            }
        }
        Provider::Ollama => {
            let base_url = args
                .ollama_base_url
                .as_deref()
                .unwrap_or(llm::DEFAULT_OLLAMA_BASE_URL);
            let names = llm::list_ollama_models(base_url).await;
            if names.is_empty() {
                eprintln!("No Ollama models found. Make sure Ollama is running locally.");
                eprintln!("Learn how to install Ollama: https://ollama.com/download");
                std::process::exit(1);
            }
            for name in names {
                println!("{}", name);
            }
        }
    }
    Ok(())
}

async fn query(args: QueryArgs) -> anyhow::Result<()> {
    logger::init_cli_logger(args.verbose);
    let data_dir = args.data_dir.clone().unwrap_or_else(|| "data".to_string());
    let embedding: EmbeddingKind = args.embedding.as_deref().unwrap_or("ollama").parse()?;
    let embedder: Arc<dyn EmbeddingProvider> = match embedding {
        EmbeddingKind::Ollama => Arc::new(OllamaEmbedder::new(
            args.ollama_base_url
                .as_deref()
                .unwrap_or(llm::DEFAULT_OLLAMA_BASE_URL),
            args.embedding_model
                .as_deref()
                .unwrap_or(llm::embeddings::DEFAULT_EMBEDDING_MODEL),
        )?),
        EmbeddingKind::Hash => Arc::new(HashEmbedder::default()),
    };

    let rag = RagAgent::new(LocalStorage::new(&data_dir), embedder)?;
    if !rag.load_persisted().await? {
        eprintln!("❌ No knowledge base found under {}", data_dir);
        std::process::exit(1);
    }

    let hits = rag
        .query_knowledge_base(&args.text, args.num_results.unwrap_or(5))
        .await;
    if hits.is_empty() {
        println!("No matching content.");
        return Ok(());
    }
    for (i, hit) in hits.iter().enumerate() {
        println!("{}. {}\n", i + 1, hit);
    }
    Ok(())
}

fn manifest(args: ManifestArgs) -> anyhow::Result<()> {
    logger::init_cli_logger(args.verbose);
    let text = match std::fs::read_to_string(&args.path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("❌ Cannot read {}: {}", args.path.display(), e);
            std::process::exit(1);
        }
    };

    let (manifest, issues) = Manifest::scan(&text);
    println!(
        "Parsed {} requirements from {}",
        manifest.entries.len(),
        args.path.display()
    );
    let sections = manifest.sections();
    if !sections.is_empty() {
        println!("Sections: {}", sections.join(", "));
    }

    for (line, message) in &issues {
        eprintln!("❌ line {}: {}", line, message);
    }
    let conflicts = manifest.conflicts();
    for conflict in &conflicts {
        eprintln!("⚠️ conflict: {}", conflict);
    }

    if issues.is_empty() && conflicts.is_empty() {
        println!("✅ Manifest is valid: no malformed lines, no conflicting constraints");
        Ok(())
    } else {
        std::process::exit(1);
    }
}

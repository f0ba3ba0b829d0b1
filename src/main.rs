use anyhow::{Context, Result};
use clap::Parser;
use docweb::cli::{Cli, Commands};
use docweb::config::LoggingConfig;
use docweb::ingest::IngestionFlow;
use docweb::trace::{FileSystemTraceStore, TraceStore};
use docweb::{utils, AgentSystem, LLMClient, Orchestrator, RunConfig, Settings};
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const DEMO_QUERIES: [&str; 3] = [
    "From the document you are provided with, tell me what is the deep research capability?",
    "What are the latest developments in AI in 2024?",
    "What's the recipe for chocolate chip cookies?",
];

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = Settings::new()?;
    init_logging(&settings.logging);

    match cli.command {
        Commands::Ask {
            query,
            workflow,
            trace_id,
            no_sensitive,
            advisory,
        } => {
            let mut config = RunConfig::from_settings(&settings.tracing);
            if let Some(workflow) = workflow {
                config.workflow_name = workflow;
            }
            if let Some(trace_id) = trace_id {
                config = config.with_trace_id(trace_id);
            }
            if no_sensitive {
                config = config.with_sensitive_data(false);
            }
            if advisory {
                config = config.with_guardrail_mode(docweb::agents::GuardrailMode::Advisory);
            }
            handle_ask(&settings, &query, &config).await
        }
        Commands::Demo => handle_demo(&settings).await,
        Commands::Batch { file, concurrency } => handle_batch(&settings, file, concurrency).await,
        Commands::Ingest {
            file,
            name,
            check_only,
        } => handle_ingest(&settings, file, name, check_only).await,
        Commands::Traces { trace_id } => handle_traces(&settings, trace_id).await,
    }
}

/// `RUST_LOG` wins over `logging.level`. Logs go to stderr so answers stay clean on stdout.
fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn trace_store(settings: &Settings) -> Result<Option<Arc<dyn TraceStore>>> {
    match &settings.tracing.store_dir {
        Some(dir) => {
            let store = FileSystemTraceStore::new(PathBuf::from(dir)).await?;
            Ok(Some(Arc::new(store)))
        }
        None => Ok(None),
    }
}

async fn build_orchestrator(settings: &Settings) -> Result<Orchestrator> {
    let api_key = Settings::api_key()?;
    let system = AgentSystem::from_settings(settings)?;
    let model = Arc::new(LLMClient::new(api_key, settings.llm.clone()));

    let mut orchestrator = system.orchestrator(model, settings)?;
    if let Some(store) = trace_store(settings).await? {
        orchestrator = orchestrator.with_trace_store(store);
    }
    Ok(orchestrator)
}

async fn handle_ask(settings: &Settings, query: &str, config: &RunConfig) -> Result<()> {
    let orchestrator = build_orchestrator(settings).await?;
    utils::print_info("Processing query...");

    let result = orchestrator.run(query, config).await?;
    utils::print_run_result(&result);
    Ok(())
}

async fn handle_demo(settings: &Settings) -> Result<()> {
    let orchestrator = build_orchestrator(settings).await?;

    for query in DEMO_QUERIES {
        utils::print_header(query);

        // Fresh config per query so each run gets its own trace id
        let config = RunConfig::from_settings(&settings.tracing);
        match orchestrator.run(query, &config).await {
            Ok(result) => utils::print_run_result(&result),
            Err(e) => {
                utils::print_error(&format!("Error: {}", e));
                utils::print_info(&format!("Trace ID: {}", e.trace_id()));
            }
        }
    }
    Ok(())
}

async fn handle_batch(settings: &Settings, file: String, concurrency: usize) -> Result<()> {
    utils::print_info(&format!(
        "Processing queries from {} with concurrency {}",
        file, concurrency
    ));

    let file = File::open(&file)
        .await
        .with_context(|| format!("Failed to open {}", file))?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let mut queries = vec![];
    while let Some(line) = lines.next_line().await? {
        if !line.trim().is_empty() {
            queries.push(line);
        }
    }

    let orchestrator = build_orchestrator(settings).await?;
    let orchestrator = &orchestrator;

    let mut results: Vec<_> = stream::iter(queries.into_iter().enumerate())
        .map(|(i, query)| async move {
            let config = RunConfig::from_settings(&settings.tracing);
            let result = orchestrator.run(&query, &config).await;
            (i, query, result)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;
    results.sort_by_key(|(i, _, _)| *i);

    let mut failures = 0;
    for (i, query, result) in &results {
        utils::print_header(&format!("Query {}: {}", i + 1, query));
        match result {
            Ok(result) => utils::print_run_result(result),
            Err(e) => {
                failures += 1;
                utils::print_error(&format!("Error: {}", e));
            }
        }
    }

    if failures > 0 {
        utils::print_warning(&format!("{} of {} queries failed", failures, results.len()));
    }
    Ok(())
}

async fn handle_ingest(
    settings: &Settings,
    file: Option<PathBuf>,
    name: Option<String>,
    check_only: Option<String>,
) -> Result<()> {
    let flow = IngestionFlow::from_settings(settings)?;

    if let Some(vector_store_id) = check_only {
        let snapshot = flow.check_status(&vector_store_id).await?;
        utils::print_status(&snapshot);
        return Ok(());
    }

    let path = file.unwrap_or_else(|| PathBuf::from(&settings.ingestion.default_file));
    let name = name.unwrap_or_else(|| settings.ingestion.store_name.clone());

    utils::print_info(&format!("Ingesting {} into '{}'...", path.display(), name));
    let report = flow.run(&path, &name).await?;

    match &report.status {
        Some(snapshot) => utils::print_status(snapshot),
        None => utils::print_warning("Processing status unavailable; check again with --check-only"),
    }
    utils::print_success(&format!("Vector store ready: {}", report.vector_store_id));
    println!("VECTOR_STORE_ID={}", report.vector_store_id);
    Ok(())
}

async fn handle_traces(settings: &Settings, trace_id: Option<String>) -> Result<()> {
    let Some(store) = trace_store(settings).await? else {
        utils::print_warning("Trace persistence is disabled; set APP__TRACING__STORE_DIR to enable it");
        return Ok(());
    };

    match trace_id {
        Some(trace_id) => match store.load(&trace_id).await? {
            Some(record) => utils::print_trace(&record)?,
            None => utils::print_error(&format!("No trace with id {}", trace_id)),
        },
        None => {
            let ids = store.list().await?;
            if ids.is_empty() {
                utils::print_info("No traces recorded yet.");
            }
            for id in ids {
                if let Some(record) = store.load(&id).await? {
                    utils::print_trace_summary(&record);
                }
            }
        }
    }
    Ok(())
}

//! `termsearch` command line: build the term corpus and query it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use termsearch_kb::{
    create_embedding_provider, ExactVectorIndex, IndexConfig, IndexedSearchBackend, IngestionPipeline,
    JsonFileTermRepository, RetrievalService, TermDraft, TermRecordInput, TermSearchClient,
    TermSearchConfig, TermSearchRequest, TraceContext,
};
use termsearch_monitoring::{init_logging, LogExt};

/// Semantic search over economic term definitions
#[derive(Parser)]
#[command(name = "termsearch", version, about)]
struct Cli {
    /// YAML configuration file; overrides TERMSEARCH_CONFIG
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed extracted term drafts and replace the corpus
    Ingest {
        /// JSON array of {term, english, definition}
        #[arg(short, long)]
        input: PathBuf,
        /// Source document recorded on every term; defaults to the input file name
        #[arg(short, long)]
        source: Option<String>,
    },
    /// Replace the corpus with records that already carry embeddings
    Import {
        /// JSON array of term records
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Find the terms closest to a query
    Search {
        query: String,
        /// Number of results (1-10); defaults to the configured value
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        std::env::set_var("TERMSEARCH_CONFIG", path);
    }
    let config = TermSearchConfig::load().context("Failed to load configuration")?;

    init_logging(&config.monitoring)?;
    #[cfg(feature = "prometheus")]
    {
        if let Some(addr) = &config.monitoring.metrics_listen_addr {
            termsearch_monitoring::metrics::install_prometheus_exporter(addr)?;
        }
    }

    match cli.command {
        Commands::Ingest { input, source } => {
            let drafts: Vec<TermDraft> = read_json(&input).await?;
            let source = source.unwrap_or_else(|| file_name(&input));
            let report = ingestion_pipeline(&config)
                .await?
                .rebuild_corpus(drafts, &source, &TraceContext::new_root())
                .await
                .log_err("Corpus rebuild failed")?;
            print_json(&report)?;
        }
        Commands::Import { input } => {
            let records: Vec<TermRecordInput> = read_json(&input).await?;
            let report = ingestion_pipeline(&config)
                .await?
                .import_precomputed(records, &TraceContext::new_root())
                .await
                .log_err("Corpus import failed")?;
            print_json(&report)?;
        }
        Commands::Search { query, top_k } => {
            let service = retrieval_service(&config).await?;
            service.warm_index().await?;

            let (search_tx, search_rx) = mpsc::channel(16);
            let handle = tokio::spawn(service.run(search_rx));
            let client = TermSearchClient::new(search_tx);

            let request = TermSearchRequest::new(query, top_k.unwrap_or(config.default_top_k));
            let response = client.search(request, TraceContext::new_root()).await?;
            print_json(&response)?;

            drop(client);
            handle.await.context("Retrieval service task failed")?;
        }
    }

    Ok(())
}

async fn retrieval_service(config: &TermSearchConfig) -> Result<RetrievalService> {
    let provider = create_embedding_provider(&config.embedding)?;
    let repository = Arc::new(JsonFileTermRepository::open(&config.corpus_path).await?);

    let service = RetrievalService::new(provider, repository);
    Ok(match index_backend(config).await {
        Some(backend) => service.with_backend(backend),
        None => service,
    })
}

async fn ingestion_pipeline(config: &TermSearchConfig) -> Result<IngestionPipeline> {
    let provider = create_embedding_provider(&config.embedding)?;
    let repository = Arc::new(JsonFileTermRepository::open(&config.corpus_path).await?);

    let pipeline = IngestionPipeline::new(provider, repository, config.batch_size);
    Ok(match index_backend(config).await {
        // The in-process index does not outlive the command
        Some(backend) if !matches!(config.index, IndexConfig::Exact) => pipeline.with_index(backend),
        _ => pipeline,
    })
}

/// Builds the configured backend. A backend that cannot be reached is
/// reported and left out; searches then use the full scan.
async fn index_backend(config: &TermSearchConfig) -> Option<Arc<dyn IndexedSearchBackend>> {
    match &config.index {
        IndexConfig::None => None,
        IndexConfig::Exact => Some(Arc::new(ExactVectorIndex::new())),
        #[cfg(feature = "neo4rs")]
        IndexConfig::Neo4j(neo4j) => match termsearch_kb::Neo4jVectorIndex::connect(neo4j.clone()).await {
            Ok(index) => Some(Arc::new(index)),
            Err(e) => {
                warn!(reason = e.kind(), error = %e, "Neo4j vector index unavailable, continuing without it");
                None
            }
        },
        #[cfg(not(feature = "neo4rs"))]
        IndexConfig::Neo4j(_) => {
            warn!("Neo4j index configured but the 'neo4rs' feature is disabled");
            None
        }
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value = serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse {}", path.display()))?;
    info!(path = %path.display(), "Input loaded");
    Ok(value)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

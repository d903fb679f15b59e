use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use manualqa_answer::{AnswerAssembler, GeminiGenerator, QaService};
use manualqa_core::chunker::AdaptiveChunker;
use manualqa_core::config::{Config, Settings};
use manualqa_core::error::Error;
use manualqa_core::loader::expand_documents;
use manualqa_core::pipeline::IngestionPipeline;
use manualqa_embed::{get_default_embedder, get_default_reranker};
use manualqa_retrieval::RetrievalEngine;
use manualqa_vector::{LanceIndexBuilder, LanceVectorIndex};

#[derive(Parser)]
#[command(name = "manualqa", about = "Question answering over aircraft flight manuals")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk documents and build the vector index (replaces any existing index)
    Ingest {
        /// Files or directories; defaults to data.documents_dir
        paths: Vec<PathBuf>,
    },
    /// Answer a question from the ingested manual
    Ask {
        #[arg(required = true)]
        question: Vec<String>,
        /// Print `{"answer": ..., "pages": [...]}`
        #[arg(long)]
        json: bool,
    },
    /// Print passages and metadata without touching the index
    Inspect {
        paths: Vec<PathBuf>,
        /// Stop after this many passages
        #[arg(long)]
        limit: Option<usize>,
        /// Print the full passage metadata as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let settings = config.settings()?;

    match cli.command {
        Command::Ingest { paths } => ingest(&settings, &paths).await,
        Command::Ask { question, json } => ask(&settings, &question.join(" "), json).await,
        Command::Inspect { paths, limit, json } => inspect(&settings, &paths, limit, json),
    }
}

fn documents(settings: &Settings, paths: &[PathBuf]) -> Vec<PathBuf> {
    if paths.is_empty() {
        expand_documents(&[settings.data.documents_path()])
    } else {
        expand_documents(paths)
    }
}

fn pipeline(settings: &Settings) -> IngestionPipeline {
    IngestionPipeline::new(AdaptiveChunker::from_settings(&settings.chunking))
        .aircraft_type(settings.document.aircraft_type.clone())
}

async fn ingest(settings: &Settings, paths: &[PathBuf]) -> Result<()> {
    let docs = documents(settings, paths);
    if docs.is_empty() {
        bail!("no .txt or .pdf documents found");
    }
    println!("Manual Ingestion\n================");
    println!("Documents: {}", docs.len());

    let embedder = get_default_embedder(&settings.models)?;
    let lancedb_path = settings.data.lancedb_path();
    let builder = LanceIndexBuilder::new(&lancedb_path, &settings.data.table, embedder).show_progress(true);
    let (_index, report) = pipeline(settings).run(&docs, &builder).await?;

    for doc in &report.documents {
        println!("📄 {} ({}): {} pages, {} passages", doc.source, doc.doc_id, doc.pages, doc.passages);
    }
    println!("\n✅ Ingestion completed: {} passages indexed into {}", report.total_passages, lancedb_path.display());
    Ok(())
}

async fn ask(settings: &Settings, question: &str, json: bool) -> Result<()> {
    let service = QaService::new();
    match LanceVectorIndex::open(&settings.data.lancedb_path(), &settings.data.table).await {
        Ok(index) => {
            let embedder = get_default_embedder(&settings.models)?;
            let manifest = index.manifest();
            if manifest.embedder_id != embedder.id() {
                return Err(Error::InvalidConfig(format!(
                    "index was built with {} but the configured embedder is {}; re-run ingest",
                    manifest.embedder_id,
                    embedder.id()
                ))
                .into());
            }
            let reranker = get_default_reranker(&settings.models)?;
            let engine = RetrievalEngine::from_settings(embedder, Arc::new(index), reranker, &settings.retrieval);
            let generator = Arc::new(GeminiGenerator::from_settings(&settings.models)?);
            service.set_ready(AnswerAssembler::from_settings(engine, generator, &settings.answer)?);
        }
        Err(Error::NotReady) => {}
        Err(e) => return Err(e.into()),
    }

    match service.ask(question).await {
        Ok(answer) if json => println!("{}", serde_json::to_string_pretty(&answer)?),
        Ok(answer) => {
            println!("{}\n", answer.answer);
            let pages: Vec<String> = answer.pages.iter().map(u32::to_string).collect();
            println!("📖 Source pages: {}", pages.join(", "));
        }
        Err(Error::NotReady) => bail!("{} (run `manualqa ingest` first)", Error::NotReady),
        Err(Error::NoRelevantContent) => println!("🔍 No relevant content found in the manual."),
        Err(e) => return Err(e.into()),
    }
    service.shutdown();
    Ok(())
}

fn inspect(settings: &Settings, paths: &[PathBuf], limit: Option<usize>, json: bool) -> Result<()> {
    let docs = documents(settings, paths);
    let ingested = pipeline(settings).process(&docs)?;
    let shown = limit.unwrap_or(usize::MAX);
    for passage in ingested.passages.iter().take(shown) {
        println!("── {} ({} chars) {}", passage.chunk_id(), passage.text.chars().count(), passage.metadata.page.tags.tag_line());
        if json {
            println!("{}", serde_json::to_string_pretty(&passage.metadata)?);
        }
        println!("{}\n", passage.text);
    }
    for doc in &ingested.report.documents {
        println!("📄 {}: {} pages, {} passages", doc.source, doc.pages, doc.passages);
    }
    println!("📊 Total passages: {}", ingested.report.total_passages);
    Ok(())
}

use anyhow::{Context, Result};
use clap::Parser;
use lawguide::{init_tracing, DEFAULT_LOG_FILTER};
use lawguide_core::Settings;
use lawguide_knowledge::{create_embedder, IngestionPipeline, TextChunker};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "lawguide-ingest",
    about = "Build the passage index from a directory of legal PDFs"
)]
struct IngestCli {
    /// Directory of PDF files, or a single PDF
    #[arg(long, default_value = "data")]
    source: PathBuf,

    /// Index file to write (defaults to index.path from configuration)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Maximum passage length in characters
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Characters shared between consecutive passages
    #[arg(long)]
    chunk_overlap: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(DEFAULT_LOG_FILTER);
    let cli = IngestCli::parse();

    let mut settings = Settings::load().context("failed to load configuration")?;
    if let Some(size) = cli.chunk_size {
        settings.chunking.chunk_size = size;
    }
    if let Some(overlap) = cli.chunk_overlap {
        settings.chunking.chunk_overlap = overlap;
    }
    settings.validate_for_ingest().context("invalid ingestion settings")?;

    let output = cli.output.unwrap_or_else(|| settings.index.path.clone());
    let chunker = TextChunker::new(settings.chunking)?;
    let embedder = create_embedder(&settings.embedding).context("failed to set up the embedding backend")?;

    info!(
        "Ingesting {} into {} (chunk size {}, overlap {})",
        cli.source.display(),
        output.display(),
        settings.chunking.chunk_size,
        settings.chunking.chunk_overlap
    );

    let pipeline = IngestionPipeline::new(chunker, embedder, settings.index.metric);
    let report = pipeline
        .run(&cli.source, &output)
        .await
        .with_context(|| format!("ingestion of {} failed", cli.source.display()))?;

    println!(
        "Loaded {} documents from {} PDF files ({} skipped).",
        report.documents,
        report.files_found - report.files_skipped,
        report.files_skipped
    );
    println!("Split into {} passages.", report.passages);
    println!(
        "Index written to {} ({} dimensions, model {}).",
        report.output.display(),
        report.dimension,
        report.embedding_model
    );
    Ok(())
}

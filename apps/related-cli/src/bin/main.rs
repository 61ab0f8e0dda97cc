use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use related_core::config::{Config, RunSettings};
use related_core::error::Error;
use related_core::input::load_corpus;
use related_core::output::write_mapping_to_path;
use related_embed::get_default_embedder;
use related_rank::{Pipeline, PipelineOptions};

#[derive(Parser)]
#[command(name = "related-posts")]
#[command(about = "For every document, list the most similar documents sharing a category")]
#[command(version)]
struct Cli {
    /// Input records (JSON array, or JSON Lines for .jsonl/.ndjson)
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Destination for `<id> => <id>,<id>,...` lines
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Neighbors per document
    #[arg(short)]
    k: Option<usize>,
    /// Documents ranked concurrently
    #[arg(long)]
    workers: Option<usize>,
    /// Whole-run time budget in seconds
    #[arg(long)]
    deadline_secs: Option<u64>,
    /// Use the hashing embedder instead of loading a model
    #[arg(long)]
    fake_embeddings: bool,
    /// Show a progress bar while ranking
    #[arg(long)]
    progress: bool,
}

impl Cli {
    fn apply(&self, settings: &mut RunSettings) {
        if let Some(input) = &self.input { settings.input_path = input.to_string_lossy().into_owned(); }
        if let Some(output) = &self.output { settings.output_path = output.to_string_lossy().into_owned(); }
        if let Some(k) = self.k { settings.k = k; }
        if let Some(workers) = self.workers { settings.workers = workers; }
        if self.deadline_secs.is_some() { settings.deadline_secs = self.deadline_secs; }
        if self.progress { settings.progress = true; }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;
    let mut settings = config.run_settings()?;
    cli.apply(&mut settings);
    settings.validate()?;
    let mut embedding = config.embedding_settings()?;
    embedding.fake |= cli.fake_embeddings;
    config.check_embedding(&embedding)?;

    let input = settings.input_path();
    let output = settings.output_path();
    let corpus = load_corpus(&input)?;

    let embedder = get_default_embedder(&embedding)
        .map_err(|e| Error::EmbedderUnavailable(format!("{:#}", e)))?;
    let pipeline = Pipeline::new(Arc::from(embedder), PipelineOptions::from(&settings));
    let mapping = pipeline.run_blocking(corpus, settings.k)?;

    for warning in &mapping.warnings {
        warn!("{}", warning);
    }
    write_mapping_to_path(&mapping, &output)?;
    info!(
        input = %input.display(),
        output = %output.display(),
        documents = mapping.len(),
        warnings = mapping.warnings.len(),
        "done"
    );
    Ok(())
}

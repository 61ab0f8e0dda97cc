use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use related_core::config::RunSettings;
use related_core::error::{Error, Result};
use related_core::traits::Embedder;
use related_core::types::{Corpus, NeighborEntry, NeighborMapping, RunWarning, WarningKind};

use crate::embeddings::{EmbedPolicy, EmbeddingTable};
use crate::filter::filter_candidates;
use crate::rank::{rank, EmbeddingSource};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Documents ranked concurrently.
    pub workers: usize,
    pub embed: EmbedPolicy,
    /// Budget for the whole run, embedding included.
    pub deadline: Option<Duration>,
    pub progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self { Self::from(&RunSettings::default()) }
}

impl From<&RunSettings> for PipelineOptions {
    fn from(s: &RunSettings) -> Self {
        Self {
            workers: s.workers.max(1),
            embed: EmbedPolicy::from(s),
            deadline: s.deadline_secs.map(Duration::from_secs),
            progress: s.progress,
        }
    }
}

/// Drives Filter → embed → Score → Rank for every document of a corpus.
///
/// The embedder is injected once and shared by all calls of a run.
pub struct Pipeline {
    embedder: Arc<dyn Embedder>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(embedder: Arc<dyn Embedder>, options: PipelineOptions) -> Self { Self { embedder, options } }

    /// Neighbor lists for every document, in corpus order.
    ///
    /// Per-document problems become [`RunWarning`]s; only an unavailable
    /// embedder, an expired deadline or a crashed worker fail the run.
    pub async fn run(&self, corpus: impl Into<Arc<Corpus>>, k: usize) -> Result<NeighborMapping> {
        let corpus = corpus.into();
        match self.options.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.run_inner(corpus, k))
                .await
                .map_err(|_| Error::DeadlineExceeded(deadline))?,
            None => self.run_inner(corpus, k).await,
        }
    }

    /// Blocking wrapper around [`Pipeline::run`] on a fresh runtime.
    /// Must not be called from inside an async context.
    pub fn run_blocking(&self, corpus: impl Into<Arc<Corpus>>, k: usize) -> Result<NeighborMapping> {
        tokio::runtime::Runtime::new()?.block_on(self.run(corpus, k))
    }

    async fn run_inner(&self, corpus: Arc<Corpus>, k: usize) -> Result<NeighborMapping> {
        let start = Instant::now();
        info!(documents = corpus.len(), k, workers = self.options.workers, "starting run");
        let table = Arc::new(EmbeddingTable::build(&corpus, Arc::clone(&self.embedder), &self.options.embed).await?);

        let pb = self.progress_bar(corpus.len());
        let outcomes: Vec<(NeighborEntry, Vec<RunWarning>)> = stream::iter(0..corpus.len())
            .map(|position| {
                let corpus = Arc::clone(&corpus);
                let table = Arc::clone(&table);
                tokio::task::spawn_blocking(move || process_document(&corpus, position, table.as_ref(), k))
            })
            .buffered(self.options.workers)
            .inspect(|_| pb.inc(1))
            .map_err(|e| Error::Worker(e.to_string()))
            .try_collect()
            .await?;
        pb.finish_and_clear();

        let mut mapping = NeighborMapping { entries: Vec::with_capacity(outcomes.len()), warnings: Vec::new() };
        for (entry, warnings) in outcomes {
            mapping.entries.push(entry);
            mapping.warnings.extend(warnings);
        }
        info!(
            documents = mapping.len(),
            warnings = mapping.warnings.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "run complete"
        );
        Ok(mapping)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.options.progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents ({percent}%)")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

/// Neighbor list for the document at `position`, plus whatever went wrong on the way.
///
/// A query that cannot be embedded or scored yields an empty list and a
/// warning; skipped candidates only shorten the list.
pub fn process_document<S>(corpus: &Corpus, position: usize, source: &S, k: usize) -> (NeighborEntry, Vec<RunWarning>)
where
    S: EmbeddingSource + ?Sized,
{
    let doc = &corpus[position];
    let candidates = filter_candidates(doc, corpus);
    let mut warnings = Vec::new();

    let neighbor_ids = match rank(doc, &candidates, source, k) {
        Ok(ranking) => {
            warnings.extend(ranking.skipped.iter().map(|(candidate_id, e)| RunWarning {
                source_id: doc.id.clone(),
                kind: WarningKind::CandidateSkipped { candidate_id: candidate_id.clone(), reason: e.to_string() },
            }));
            ranking.neighbor_ids()
        }
        Err(e) => {
            let kind = match e {
                Error::DegenerateVector => WarningKind::QueryDegenerate,
                other => WarningKind::QueryEmbedFailed(other.to_string()),
            };
            warnings.push(RunWarning { source_id: doc.id.clone(), kind });
            Vec::new()
        }
    };
    (NeighborEntry { source_id: doc.id.clone(), neighbor_ids }, warnings)
}

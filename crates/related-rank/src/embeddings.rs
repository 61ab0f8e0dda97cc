//! Run-scoped embedding table keyed by exact text.
//!
//! Every unique title is embedded once, up front, in batches. Each embedder
//! call runs on the blocking pool behind a semaphore gate and a timeout. A
//! failed batch is retried text by text so one bad input cannot sink its
//! neighbors; a long streak of failures means the embedder itself is gone and
//! ends the run.

use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use related_core::config::RunSettings;
use related_core::error::{Error, Result};
use related_core::traits::Embedder;
use related_core::types::{Corpus, Document};

use crate::rank::EmbeddingSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedPolicy {
    pub batch_size: usize,
    pub concurrency: usize,
    pub timeout: Duration,
    pub max_retries: u32,
    pub unavailable_after: u32,
}

impl Default for EmbedPolicy {
    fn default() -> Self { Self::from(&RunSettings::default()) }
}

impl From<&RunSettings> for EmbedPolicy {
    fn from(s: &RunSettings) -> Self {
        Self {
            batch_size: s.batch_size.max(1),
            concurrency: s.embed_concurrency.max(1),
            timeout: Duration::from_secs(s.embed_timeout_secs),
            max_retries: s.max_embed_retries,
            unavailable_after: s.unavailable_after.max(1),
        }
    }
}

type Slot = std::result::Result<Vec<f32>, String>;

pub struct EmbeddingTable {
    by_text: HashMap<String, Slot>,
}

impl EmbeddingTable {
    pub async fn build(corpus: &Corpus, embedder: Arc<dyn Embedder>, policy: &EmbedPolicy) -> Result<Self> {
        let texts = unique_texts(corpus);
        let start = Instant::now();
        info!(documents = corpus.len(), unique_texts = texts.len(), "embedding corpus");

        let gate = Arc::new(Semaphore::new(policy.concurrency));
        let dim = embedder.dim();
        let mut by_text = HashMap::with_capacity(texts.len());
        let mut failures = FailureStreak::new(policy.unavailable_after);

        let batches: Vec<Vec<String>> = texts.chunks(policy.batch_size).map(<[String]>::to_vec).collect();
        let mut results = std::pin::pin!(stream::iter(batches)
            .map(|batch| {
                let call = call_embedder(Arc::clone(&embedder), Arc::clone(&gate), batch.clone(), policy.timeout);
                async move { (batch, call.await) }
            })
            .buffered(policy.concurrency));

        while let Some((batch, outcome)) = results.next().await {
            let outcome = outcome.and_then(|vectors| {
                if vectors.len() == batch.len() {
                    Ok(vectors)
                } else {
                    Err(Error::EmbedderUnavailable(format!(
                        "embedder returned {} vectors for {} texts",
                        vectors.len(),
                        batch.len()
                    )))
                }
            });
            match outcome {
                Ok(vectors) => {
                    debug!(batch = batch.len(), "batch embedded");
                    for (text, vector) in batch.into_iter().zip(vectors) {
                        let slot = check_dim(vector, dim);
                        failures.record(&slot)?;
                        by_text.insert(text, slot);
                    }
                }
                Err(e) => {
                    warn!(batch = batch.len(), error = %e, "batch failed, retrying texts individually");
                    for text in batch {
                        let slot = embed_single(&embedder, &gate, &text, policy, dim).await;
                        failures.record(&slot)?;
                        by_text.insert(text, slot);
                    }
                }
            }
        }

        let failed = by_text.values().filter(|s| s.is_err()).count();
        info!(
            embedded = by_text.len() - failed,
            failed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "corpus embedded"
        );
        Ok(Self { by_text })
    }
}

impl EmbeddingSource for EmbeddingTable {
    fn embedding(&self, doc: &Document) -> Result<&[f32]> {
        match self.by_text.get(&doc.text) {
            Some(Ok(v)) => Ok(v),
            Some(Err(reason)) => Err(Error::EmbedderUnavailable(reason.clone())),
            None => Err(Error::MissingEmbedding(doc.id.clone())),
        }
    }
}

/// Titles in first-occurrence order, each once.
fn unique_texts(corpus: &Corpus) -> Vec<String> {
    let mut seen = HashSet::with_capacity(corpus.len());
    corpus
        .iter()
        .filter(|doc| seen.insert(doc.text.as_str()))
        .map(|doc| doc.text.clone())
        .collect()
}

fn check_dim(vector: Vec<f32>, dim: usize) -> Slot {
    if vector.len() == dim {
        Ok(vector)
    } else {
        Err(Error::DimensionMismatch { expected: dim, actual: vector.len() }.to_string())
    }
}

async fn embed_single(
    embedder: &Arc<dyn Embedder>,
    gate: &Arc<Semaphore>,
    text: &str,
    policy: &EmbedPolicy,
    dim: usize,
) -> Slot {
    let mut last_error = String::new();
    for attempt in 0..=policy.max_retries {
        match call_embedder(Arc::clone(embedder), Arc::clone(gate), vec![text.to_string()], policy.timeout).await {
            Ok(mut vectors) if vectors.len() == 1 => return check_dim(vectors.remove(0), dim),
            Ok(vectors) => last_error = format!("embedder returned {} vectors for 1 text", vectors.len()),
            Err(Error::EmbedderUnavailable(reason)) => last_error = reason,
            Err(e) => last_error = e.to_string(),
        }
        debug!(attempt, error = %last_error, "single-text embedding attempt failed");
    }
    Err(last_error)
}

/// One embedder call on the blocking pool. The permit is held until the call
/// actually returns, even if the caller has already given up on it.
async fn call_embedder(
    embedder: Arc<dyn Embedder>,
    gate: Arc<Semaphore>,
    texts: Vec<String>,
    timeout: Duration,
) -> Result<Vec<Vec<f32>>> {
    let permit = gate
        .acquire_owned()
        .await
        .map_err(|e| Error::EmbedderUnavailable(e.to_string()))?;
    let task = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        embedder.embed_batch(&texts)
    });
    match tokio::time::timeout(timeout, task).await {
        Err(_) => Err(Error::EmbedderUnavailable(format!("timed out after {:?}", timeout))),
        Ok(Err(join)) => Err(Error::EmbedderUnavailable(format!("embedder task failed: {}", join))),
        Ok(Ok(Err(e))) => Err(Error::EmbedderUnavailable(format!("{:#}", e))),
        Ok(Ok(Ok(vectors))) => Ok(vectors),
    }
}

struct FailureStreak {
    current: u32,
    limit: u32,
}

impl FailureStreak {
    fn new(limit: u32) -> Self { Self { current: 0, limit } }

    fn record(&mut self, slot: &Slot) -> Result<()> {
        match slot {
            Ok(_) => self.current = 0,
            Err(reason) => {
                self.current += 1;
                if self.current >= self.limit {
                    return Err(Error::EmbedderUnavailable(format!(
                        "{} consecutive texts failed to embed, last error: {}",
                        self.current, reason
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streak_resets_on_success() {
        let mut streak = FailureStreak::new(2);
        assert!(streak.record(&Err("x".into())).is_ok());
        assert!(streak.record(&Ok(vec![1.0])).is_ok());
        assert!(streak.record(&Err("x".into())).is_ok());
        assert!(matches!(streak.record(&Err("y".into())), Err(Error::EmbedderUnavailable(_))));
    }

    #[test]
    fn unique_texts_keep_first_occurrence_order() {
        let corpus = Corpus::new(vec![
            Document::new("1", "b", ["x"]),
            Document::new("2", "a", ["x"]),
            Document::new("3", "b", ["y"]),
        ])
        .unwrap();
        assert_eq!(unique_texts(&corpus), ["b", "a"]);
    }
}

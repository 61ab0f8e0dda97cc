use std::collections::HashMap;

use related_core::error::{Error, Result};
use related_core::types::{DocId, Document, SimilarityResult};

use crate::filter::Candidate;
use crate::score::{cosine_similarity, is_degenerate};

/// Anything that can hand out the embedding of a document's text.
pub trait EmbeddingSource {
    fn embedding(&self, doc: &Document) -> Result<&[f32]>;
}

/// Exact-text lookup; convenient for stubs.
impl EmbeddingSource for HashMap<String, Vec<f32>> {
    fn embedding(&self, doc: &Document) -> Result<&[f32]> {
        self.get(&doc.text).map(Vec::as_slice).ok_or_else(|| Error::MissingEmbedding(doc.id.clone()))
    }
}

/// Ranked candidates for one query plus the candidates that could not be scored.
#[derive(Debug, Default)]
pub struct Ranking {
    pub results: Vec<SimilarityResult>,
    pub skipped: Vec<(DocId, Error)>,
}

impl Ranking {
    pub fn neighbor_ids(&self) -> Vec<DocId> {
        self.results.iter().map(|r| r.candidate_id.clone()).collect()
    }
}

/// Score `candidates` against `query` and keep the best `k`.
///
/// Results are ordered by descending score; equal scores keep the candidates'
/// input order (the sort is stable and candidates arrive in corpus order).
/// A candidate that cannot be embedded or scored is skipped and reported in
/// [`Ranking::skipped`]. A query that cannot be embedded, or whose embedding is
/// degenerate, fails the whole call.
pub fn rank<S>(query: &Document, candidates: &[Candidate<'_>], source: &S, k: usize) -> Result<Ranking>
where
    S: EmbeddingSource + ?Sized,
{
    if k == 0 || candidates.is_empty() {
        return Ok(Ranking::default());
    }
    let query_vec = source.embedding(query)?;
    if is_degenerate(query_vec) {
        return Err(Error::DegenerateVector);
    }

    let mut ranking = Ranking { results: Vec::with_capacity(candidates.len()), skipped: Vec::new() };
    for candidate in candidates {
        let scored = source
            .embedding(candidate.doc)
            .and_then(|v| cosine_similarity(query_vec, v));
        match scored {
            Ok(score) => ranking.results.push(SimilarityResult {
                position: candidate.position,
                candidate_id: candidate.doc.id.clone(),
                score,
            }),
            Err(e) => ranking.skipped.push((candidate.doc.id.clone(), e)),
        }
    }

    ranking.results.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranking.results.truncate(k);
    Ok(ranking)
}

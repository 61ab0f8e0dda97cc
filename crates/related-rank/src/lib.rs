//! Category-gated nearest-neighbor ranking.
//!
//! For each document: keep the other documents that share a category
//! ([`filter`]), score them by cosine similarity of their title embeddings
//! ([`score`]), and keep the top k with a stable tie-break ([`rank::rank`]).
//! [`pipeline`] runs that over a whole corpus with the embeddings computed
//! once per unique title ([`embeddings`]).

pub mod embeddings;
pub mod filter;
pub mod pipeline;
pub mod rank;
pub mod score;

pub use embeddings::{EmbedPolicy, EmbeddingTable};
pub use filter::{filter_candidates, Candidate};
pub use pipeline::{process_document, Pipeline, PipelineOptions};
pub use rank::{rank, EmbeddingSource, Ranking};
pub use score::cosine_similarity;

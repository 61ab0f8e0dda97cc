use thiserror::Error;

use crate::types::DocId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed input: {0}")]
    InputFormat(String),

    #[error("Degenerate vector: embedding has zero norm")]
    DegenerateVector,

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedder unavailable: {0}")]
    EmbedderUnavailable(String),

    #[error("No embedding available for document {0}")]
    MissingEmbedding(DocId),

    #[error("Run exceeded its deadline of {0:?}")]
    DeadlineExceeded(std::time::Duration),

    #[error("Worker task failed: {0}")]
    Worker(String),

    #[error("Failed to write output: {0}")]
    OutputWrite(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

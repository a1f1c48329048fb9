use thiserror::Error;

/// Errors that can occur during embedding operations
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Failed to initialize the embedding model
    #[error("Failed to initialize embedding model: {0}")]
    ModelInitialization(String),

    /// Failed to generate embeddings
    #[error("Failed to generate embeddings: {0}")]
    EmbeddingGeneration(String),

    /// Invalid input provided to the embedding provider
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The blocking embedding task panicked or was cancelled
    #[error("Embedding task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, EmbeddingError>;

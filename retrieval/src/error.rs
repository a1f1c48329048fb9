use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] ragctx_embeddings::EmbeddingError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Document store returned {status}: {body}")]
    Store { status: u16, body: String },

    #[error("Malformed store response: {0}")]
    MalformedResponse(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Reranking error: {0}")]
    Reranking(String),

    #[error("Background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, RetrievalError>;

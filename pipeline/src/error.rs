use ragctx_cache::CacheError;
use ragctx_context::ContextError;
use ragctx_retrieval::RetrievalError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid {section} configuration: {message}")]
    InvalidConfig { section: &'static str, message: String },

    #[error("Failed to read config file {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ParseConfig(#[from] toml::de::Error),

    #[error("Failed to render config: {0}")]
    RenderConfig(#[from] toml::ser::Error),

    #[error("Context optimizer error: {0}")]
    Context(#[from] ContextError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

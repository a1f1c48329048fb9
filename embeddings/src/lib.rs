//! # ragctx Embeddings
//!
//! Text embedding for query-time search and bulk ingestion.
//!
//! - [`EmbeddingProvider`]: the seam every consumer depends on
//! - [`FastembedProvider`]: local ONNX models via fastembed-rs, with Nomic
//!   task prefixes applied per [`TaskType`]
//! - [`embed_bounded`] / [`BulkEmbedder`]: bulk embedding with a fixed
//!   number of concurrent workers (`EmbeddingConfig::max_workers`)
//!
//! ## Example
//!
//! ```no_run
//! use ragctx_embeddings::{EmbeddingProvider, FastembedProvider, TaskType};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let provider = FastembedProvider::new().await?;
//!     let embedding = provider
//!         .embed("how are refunds processed?", TaskType::RetrievalQuery)
//!         .await?;
//!     println!("dimension {}", embedding.len());
//!     Ok(())
//! }
//! ```

mod bulk;
mod error;
mod provider;
mod service;

pub use bulk::BulkEmbedder;
pub use bulk::embed_bounded;
pub use error::EmbeddingError;
pub use error::Result;
pub use provider::EmbeddingProvider;
pub use provider::TaskType;
pub use service::EmbeddingConfig;
pub use service::EmbeddingModelType;
pub use service::FastembedProvider;

/// Default embedding dimension for Nomic-embed-text-v1.5
pub const DEFAULT_EMBEDDING_DIM: usize = 768;

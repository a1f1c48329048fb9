/*!
# ragctx Retrieval

Candidate retrieval and reranking for context assembly:
- **Vector, keyword and hybrid search** against an external document store
- **Reciprocal Rank Fusion (RRF)** when the store cannot fuse server-side
- **Cross-encoder reranking** with a remote → local → passthrough fallback
- **Scope normalization** shared by ingestion and query-time filtering

## Architecture

```text
Query
  ├─> Vector search ─────────┐
  ├─> Keyword search ────────┤ (hybrid failed: client-side RRF, k = 60)
  └─> Hybrid search (store) ─┴─> Candidates
                                   └─> Reranker
                                         ├─ PrimaryReady: remote /v1/rerank
                                         ├─ LocalReady:   fastembed cross-encoder
                                         └─ Unavailable:  passthrough
```

## Example

```rust,no_run
use ragctx_embeddings::FastembedProvider;
use ragctx_retrieval::{
    PostgrestConfig, PostgrestStore, RerankConfig, Reranker, Retriever, SearchConfig, SearchMode,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let store = PostgrestStore::new(PostgrestConfig::from_env()?)?;
    let embedder = FastembedProvider::new().await?;
    let retriever = Retriever::new(SearchConfig::hybrid(), Arc::new(store), Arc::new(embedder));

    let candidates = retriever
        .search("how do refunds work", None, Some("https://shop.example.com/help"), 20, SearchMode::Hybrid)
        .await;

    let reranker = Reranker::new(RerankConfig::local()).await;
    for (i, c) in reranker.rerank("how do refunds work", candidates, 5).await.iter().enumerate() {
        println!("{}. {} ({:.2})", i + 1, c.source, c.relevance());
    }
    Ok(())
}
```
*/

mod config;
mod cross_encoder;
mod error;
mod fusion;
mod postgrest;
mod rerank;
mod result;
mod retrieval;
mod scope;
mod store;

pub use config::LocalRerankModel;
pub use config::RemoteRerankConfig;
pub use config::RerankBackend;
pub use config::RerankConfig;
pub use config::SearchConfig;
pub use config::SearchMode;
pub use cross_encoder::CrossEncoder;
pub use cross_encoder::FastembedCrossEncoder;
pub use cross_encoder::HttpReranker;
pub use cross_encoder::RemoteReranker;
pub use cross_encoder::RerankHit;
pub use cross_encoder::sigmoid;
pub use error::Result;
pub use error::RetrievalError;
pub use fusion::DEFAULT_RRF_K;
pub use fusion::fuse;
pub use fusion::fuse_many;
pub use postgrest::PostgrestConfig;
pub use postgrest::PostgrestStore;
pub use rerank::LocalLoader;
pub use rerank::Reranker;
pub use rerank::RerankerState;
pub use result::Candidate;
pub use result::SearchMethod;
pub use retrieval::Retriever;
pub use scope::normalize_scope;
pub use store::DocumentStore;
pub use store::HybridSearchRequest;
pub use store::KeywordSearchRequest;
pub use store::VectorSearchRequest;

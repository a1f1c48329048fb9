/*!
Context assembly pipeline.

Wires the stages of the other crates into one infallible call:

```text
ContextRequest
  │
  ├─► embed query ──────────────► SemanticCache::get ── hit ─► OptimizedContext
  │                                      │ miss
  ├─► Retriever::search (vector / keyword / hybrid)
  ├─► Reranker::rerank  (remote → local → passthrough, when enabled)
  ├─► ContextOptimizer::optimize
  └─► SemanticCache::set ─────────────────────────────────────► OptimizedContext
```

# Example

```no_run
use ragctx_embeddings::FastembedProvider;
use ragctx_pipeline::ContextPipeline;
use ragctx_pipeline::ContextRequest;
use ragctx_pipeline::PipelineConfig;
use ragctx_retrieval::PostgrestConfig;
use ragctx_retrieval::PostgrestStore;
use std::sync::Arc;

# async fn example() -> anyhow::Result<()> {
let config = PipelineConfig::from_toml_str("[cache]\nenabled = true\n")?;
let store = Arc::new(PostgrestStore::new(PostgrestConfig::from_env()?)?);
let embedder = Arc::new(FastembedProvider::new().await?);

let pipeline = ContextPipeline::new(config, store, embedder).await?;
let context = pipeline
    .assemble(&ContextRequest::new("How do I reset my password?").with_scope("https://help.example.com"))
    .await;
println!("{}", context.content);
# Ok(())
# }
```
*/

mod config;
mod error;
mod pipeline;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use error::Result;
pub use pipeline::ContextPipeline;
pub use pipeline::ContextRequest;

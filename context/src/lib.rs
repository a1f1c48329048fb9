/*!
# ragctx Context

Turns reranked retrieval candidates into one token-bounded context string
for a downstream generator.

## Pipeline

```text
Candidates
  └─> Deduplication (normalized exact match, word-set Jaccard > 0.9)
        └─> Relevance filter (rerank → combined → vector → keyword score)
              └─> Compression (blank lines, spaces, boilerplate)
                    └─> Token budget (≈ 4 chars/token, one truncated tail)
                          └─> Formatting (Source / Heading / ID / Content blocks)
```

## Example

```rust,no_run
use ragctx_context::{ContextConfig, ContextOptimizer};
use ragctx_retrieval::{Candidate, SearchMethod};

fn main() -> anyhow::Result<()> {
    let optimizer = ContextOptimizer::new(ContextConfig::default())?;
    let candidates = vec![
        Candidate::new("1", "Refunds are issued within 5 days.", "https://shop.example.com/help", SearchMethod::Vector)
            .with_vector_score(0.82),
    ];

    let context = optimizer.optimize(candidates);
    println!("{} ({} tokens)", context.content, context.optimized_tokens);
    Ok(())
}
```
*/

mod config;
mod error;
mod optimizer;
mod text;

pub use config::ContextConfig;
pub use error::ContextError;
pub use error::Result;
pub use optimizer::ContextOptimizer;
pub use optimizer::OptimizedContext;
pub use text::Compressor;
pub use text::estimate_tokens;
pub use text::normalize_text;

/*!
Semantic result cache.

Caches the assembled context of a query so that repeated or paraphrased
questions skip retrieval, reranking and optimization.

```text
get(query, embedding, scope)
  │
  ├─ exact key  sha256(query, scope) ── hit ─► value
  │
  └─ scan same-scope entries
       max cosine(embedding, stored) ≥ threshold ─► value
       otherwise                                 ─► miss
```

Entries expire by TTL class (general or indexed) and are swept every
`sweep_interval` lookups.

# Example

```no_run
use ragctx_cache::CacheConfig;
use ragctx_cache::SemanticCache;

# fn example() -> anyhow::Result<()> {
let cache: SemanticCache<String> = SemanticCache::new(&CacheConfig::memory())?;
cache.set("reset password", vec![0.1, 0.9], "context".to_string(), None);
assert!(cache.get("reset password", &[0.1, 0.9], None).is_some());
# Ok(())
# }
```
*/

mod config;
mod error;
mod key;
mod semantic;

pub use config::CacheBackend;
pub use config::CacheConfig;
pub use config::TtlClass;
pub use error::CacheError;
pub use error::Result;
pub use key::cache_key;
pub use semantic::CacheStats;
pub use semantic::EntrySnapshot;
pub use semantic::SemanticCache;

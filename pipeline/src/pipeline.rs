use crate::config::PipelineConfig;
use crate::error::Result;
use log::debug;
use log::info;
use log::warn;
use ragctx_cache::SemanticCache;
use ragctx_cache::TtlClass;
use ragctx_context::ContextOptimizer;
use ragctx_context::OptimizedContext;
use ragctx_embeddings::EmbeddingProvider;
use ragctx_embeddings::TaskType;
use ragctx_retrieval::DocumentStore;
use ragctx_retrieval::Reranker;
use ragctx_retrieval::Retriever;
use ragctx_retrieval::SearchMode;
use ragctx_retrieval::normalize_scope;
use std::sync::Arc;
use std::time::Instant;

/// A single context assembly request
#[derive(Debug, Clone, PartialEq)]
pub struct ContextRequest {
    pub query: String,
    /// Source URL restricting retrieval; normalized before use
    pub scope: Option<String>,
    /// Overrides the configured result count
    pub top_k: Option<usize>,
    /// Overrides the configured search mode
    pub mode: Option<SearchMode>,
    /// Lifetime class of the cached result
    pub ttl_class: TtlClass,
    pub use_cache: bool,
}

impl ContextRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            scope: None,
            top_k: None,
            mode: None,
            ttl_class: TtlClass::General,
            use_cache: true,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_ttl_class(mut self, ttl_class: TtlClass) -> Self {
        self.ttl_class = ttl_class;
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }
}

/// End-to-end context assembly: cache lookup, retrieval, optional
/// reranking, optimization and cache fill.
///
/// [`assemble`](Self::assemble) never fails. Every stage degrades on its
/// own and the worst case is an empty context.
pub struct ContextPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    retriever: Retriever,
    reranker: Option<Reranker>,
    optimizer: ContextOptimizer,
    cache: SemanticCache<OptimizedContext>,
}

impl ContextPipeline {
    /// Build every stage from `config`.
    ///
    /// The reranker is only created when reranking is enabled; its backends
    /// are resolved here, once.
    pub async fn new(
        config: PipelineConfig,
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        config.validate()?;

        let reranker = if config.rerank.enabled {
            Some(Reranker::new(config.rerank.clone()).await)
        } else {
            None
        };

        Self::from_parts(config, store, embedder, reranker)
    }

    /// Build the pipeline around an already constructed reranker.
    pub fn from_parts(
        config: PipelineConfig,
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        reranker: Option<Reranker>,
    ) -> Result<Self> {
        config.validate()?;

        let optimizer = ContextOptimizer::new(config.context)?;
        let cache = SemanticCache::new(&config.cache)?;
        let retriever = Retriever::new(config.search, store, Arc::clone(&embedder));

        Ok(Self {
            embedder,
            retriever,
            reranker,
            optimizer,
            cache,
        })
    }

    pub fn cache(&self) -> &SemanticCache<OptimizedContext> {
        &self.cache
    }

    pub fn reranker(&self) -> Option<&Reranker> {
        self.reranker.as_ref()
    }

    /// Drop cached contexts of one scope, or all of them when `scope` is
    /// `None`. The scope is normalized the same way `assemble` stores it.
    pub fn invalidate(&self, scope: Option<&str>) -> usize {
        let scope = scope.map(normalize_scope);
        self.cache.invalidate(scope.as_deref())
    }

    /// Assemble the context for `request`.
    pub async fn assemble(&self, request: &ContextRequest) -> OptimizedContext {
        let start = Instant::now();
        let query = request.query.as_str();
        let scope = request.scope.as_deref().map(normalize_scope);
        let scope = scope.as_deref();

        let embedding = match self.embedder.embed(query, TaskType::RetrievalQuery).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                warn!("Query embedding failed, bypassing cache: {e}");
                None
            }
        };

        let cached = match (&embedding, request.use_cache) {
            (Some(embedding), true) => self.cache.get(query, embedding, scope),
            _ => None,
        };
        if let Some(context) = cached {
            info!(
                "Context served from cache in {:.2}ms",
                start.elapsed().as_secs_f64() * 1000.0
            );
            return context;
        }

        let search = self.retriever.config();
        let mode = request.mode.unwrap_or(search.mode);
        let top_k = request.top_k.unwrap_or(match &self.reranker {
            Some(reranker) => reranker.config().top_k,
            None => search.match_count,
        });
        let fetch_count = match &self.reranker {
            Some(reranker) => reranker.config().candidate_window.max(top_k),
            None => top_k,
        };

        let candidates = self
            .retriever
            .search(query, embedding.as_deref(), scope, fetch_count, mode)
            .await;

        let candidates = match &self.reranker {
            Some(reranker) if candidates.len() > 1 => {
                reranker.rerank(query, candidates, top_k).await
            }
            _ => {
                debug!("Skipping rerank for {} candidates", candidates.len());
                let mut candidates = candidates;
                candidates.truncate(top_k);
                candidates
            }
        };

        let context = self.optimizer.optimize(candidates);

        match embedding {
            Some(embedding) if request.use_cache && !context.is_empty() => {
                self.cache
                    .set_with_ttl(query, embedding, context.clone(), scope, request.ttl_class);
            }
            _ => {}
        }

        info!(
            "Assembled context with {} chunks in {:.2}ms",
            context.optimized_chunks,
            start.elapsed().as_secs_f64() * 1000.0
        );
        context
    }
}

use crate::config::SearchConfig;
use crate::config::SearchMode;
use crate::error::Result;
use crate::fusion::fuse;
use crate::result::Candidate;
use crate::scope::normalize_scope;
use crate::store::DocumentStore;
use crate::store::HybridSearchRequest;
use crate::store::KeywordSearchRequest;
use crate::store::VectorSearchRequest;
use log::debug;
use log::info;
use log::warn;
use ragctx_embeddings::EmbeddingProvider;
use ragctx_embeddings::TaskType;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

/// Multi-strategy candidate retrieval over a [`DocumentStore`].
///
/// Backend failures never surface to the caller: keyword search falls back
/// to vector search, hybrid search falls back to client-side RRF of vector
/// and keyword results, and a failed vector search yields no candidates.
pub struct Retriever {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: SearchConfig,
}

impl Retriever {
    pub fn new(
        config: SearchConfig,
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search with the configured default mode.
    pub async fn search_default(
        &self,
        query: &str,
        query_embedding: Option<&[f32]>,
        scope: Option<&str>,
        top_k: usize,
    ) -> Vec<Candidate> {
        self.search(query, query_embedding, scope, top_k, self.config.mode)
            .await
    }

    /// Retrieve up to `top_k` candidates for `query`.
    ///
    /// `query_embedding` is computed on demand when a strategy needs it and
    /// the caller did not pass one. `scope` is normalized before filtering.
    pub async fn search(
        &self,
        query: &str,
        query_embedding: Option<&[f32]>,
        scope: Option<&str>,
        top_k: usize,
        mode: SearchMode,
    ) -> Vec<Candidate> {
        let start = Instant::now();
        let scope = scope.map(normalize_scope);
        let scope = scope.as_deref();

        let results = match mode {
            SearchMode::Vector => self.vector(query, query_embedding, scope, top_k).await,
            SearchMode::Keyword => self.keyword(query, query_embedding, scope, top_k).await,
            SearchMode::Hybrid => self.hybrid(query, query_embedding, scope, top_k).await,
        };

        info!(
            "{mode:?} search returned {} candidates in {}ms",
            results.len(),
            start.elapsed().as_millis()
        );
        results
    }

    async fn vector(
        &self,
        query: &str,
        query_embedding: Option<&[f32]>,
        scope: Option<&str>,
        top_k: usize,
    ) -> Vec<Candidate> {
        match self.try_vector(query, query_embedding, scope, top_k).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Vector search failed: {e}");
                Vec::new()
            }
        }
    }

    async fn try_vector(
        &self,
        query: &str,
        query_embedding: Option<&[f32]>,
        scope: Option<&str>,
        top_k: usize,
    ) -> Result<Vec<Candidate>> {
        let embedding = self.resolve_embedding(query, query_embedding).await?;
        let request = VectorSearchRequest {
            query_embedding: &embedding,
            match_threshold: self.config.match_threshold,
            match_count: top_k,
            filter_source_url: scope,
        };

        let mut results = self.store.vector_search(&request).await?;
        results.truncate(top_k);
        Ok(results)
    }

    async fn try_keyword(
        &self,
        query: &str,
        scope: Option<&str>,
        top_k: usize,
    ) -> Result<Vec<Candidate>> {
        let request = KeywordSearchRequest {
            query_text: query,
            match_count: top_k,
            filter_source_url: scope,
        };

        let mut results = self.store.keyword_search(&request).await?;
        results.truncate(top_k);
        Ok(results)
    }

    async fn keyword(
        &self,
        query: &str,
        query_embedding: Option<&[f32]>,
        scope: Option<&str>,
        top_k: usize,
    ) -> Vec<Candidate> {
        match self.try_keyword(query, scope, top_k).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Keyword search failed, falling back to vector search: {e}");
                self.vector(query, query_embedding, scope, top_k).await
            }
        }
    }

    async fn hybrid(
        &self,
        query: &str,
        query_embedding: Option<&[f32]>,
        scope: Option<&str>,
        top_k: usize,
    ) -> Vec<Candidate> {
        // Resolved once and shared by the RPC and the vector fallback.
        let embedding = match self.resolve_embedding(query, query_embedding).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                warn!("Query embedding failed, hybrid search limited to keyword results: {e}");
                None
            }
        };

        let vector_results = match embedding.as_deref() {
            Some(embedding) => {
                match self.try_hybrid(query, embedding, scope, top_k).await {
                    Ok(results) => return results,
                    Err(e) => {
                        warn!("Hybrid search failed, fusing vector and keyword results: {e}")
                    }
                }
                self.vector(query, Some(embedding), scope, top_k).await
            }
            None => Vec::new(),
        };
        let keyword_results = match self.try_keyword(query, scope, top_k).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Keyword search unavailable, using vector results only: {e}");
                return vector_results;
            }
        };

        debug!(
            "Client-side RRF: {} vector + {} keyword",
            vector_results.len(),
            keyword_results.len()
        );

        let mut fused = fuse(vector_results, keyword_results, self.config.rrf_k);
        fused.truncate(top_k);
        fused
    }

    async fn try_hybrid(
        &self,
        query: &str,
        embedding: &[f32],
        scope: Option<&str>,
        top_k: usize,
    ) -> Result<Vec<Candidate>> {
        let request = HybridSearchRequest {
            query_embedding: embedding,
            query_text: query,
            match_threshold: self.config.match_threshold,
            match_count: top_k,
            filter_source_url: scope,
            vector_weight: self.config.vector_weight,
            keyword_weight: self.config.keyword_weight,
        };

        let mut results = self.store.hybrid_search(&request).await?;
        results.truncate(top_k);
        Ok(results)
    }

    async fn resolve_embedding<'a>(
        &self,
        query: &str,
        query_embedding: Option<&'a [f32]>,
    ) -> Result<Cow<'a, [f32]>> {
        match query_embedding {
            Some(embedding) => Ok(Cow::Borrowed(embedding)),
            None => {
                let embedding = self.embedder.embed(query, TaskType::RetrievalQuery).await?;
                Ok(Cow::Owned(embedding))
            }
        }
    }
}

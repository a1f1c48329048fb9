use crate::error::Result;
use crate::result::Candidate;
use async_trait::async_trait;
use serde::Serialize;

/// Parameters of an embedding similarity search.
#[derive(Debug, Clone, Serialize)]
pub struct VectorSearchRequest<'a> {
    pub query_embedding: &'a [f32],
    pub match_threshold: f32,
    pub match_count: usize,
    pub filter_source_url: Option<&'a str>,
}

/// Parameters of a full-text search.
#[derive(Debug, Clone, Serialize)]
pub struct KeywordSearchRequest<'a> {
    pub query_text: &'a str,
    pub match_count: usize,
    pub filter_source_url: Option<&'a str>,
}

/// Parameters of a server-side fused search.
#[derive(Debug, Clone, Serialize)]
pub struct HybridSearchRequest<'a> {
    pub query_embedding: &'a [f32],
    pub query_text: &'a str,
    pub match_threshold: f32,
    pub match_count: usize,
    pub filter_source_url: Option<&'a str>,
    pub vector_weight: f32,
    pub keyword_weight: f32,
}

/// External document store holding chunk text, embeddings and a text index.
///
/// Implementations return candidates in the store's rank order with the
/// score fields of their search path populated and clamped to be
/// non-negative.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Nearest neighbours of `query_embedding` above the match threshold
    async fn vector_search(&self, request: &VectorSearchRequest<'_>) -> Result<Vec<Candidate>>;

    /// Full-text ranked matches of `query_text`
    async fn keyword_search(&self, request: &KeywordSearchRequest<'_>) -> Result<Vec<Candidate>>;

    /// Weighted fusion of vector and keyword search computed by the store
    async fn hybrid_search(&self, request: &HybridSearchRequest<'_>) -> Result<Vec<Candidate>>;
}

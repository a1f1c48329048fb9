use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// Which search path produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    /// Embedding similarity search
    Vector,
    /// Full-text search
    Keyword,
    /// Server-side weighted fusion of vector and keyword
    Hybrid,
    /// Client-side reciprocal rank fusion
    Fused,
}

/// A document chunk flowing through retrieval, reranking and optimization.
///
/// Each stage adds its own score field and never overwrites another stage's.
/// Scores are `None` until the stage that owns them has run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Identifier, unique within one result list
    pub id: String,

    /// Chunk text
    pub content: String,

    /// Normalized scope identifier (source URL) of the chunk
    pub source: String,

    /// Ordered chunk metadata (heading, has_code, has_table, ...)
    #[serde(default)]
    pub metadata: IndexMap<String, Value>,

    /// Search path that produced this candidate
    pub search_method: SearchMethod,

    /// Embedding similarity from the vector store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_score: Option<f32>,

    /// Text rank from the keyword store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_score: Option<f32>,

    /// Weighted score from server-side hybrid search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combined_score: Option<f32>,

    /// Reciprocal rank fusion score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fused_score: Option<f32>,

    /// Cross-encoder relevance in `[0, 1]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,

    /// 1-based position before reranking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_rank: Option<usize>,

    /// 1-based position after reranking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reranked_position: Option<usize>,

    /// Content was cut to fit the token budget
    #[serde(default)]
    pub truncated: bool,
}

impl Candidate {
    /// Create a candidate with no scores
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
        search_method: SearchMethod,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            source: source.into(),
            metadata: IndexMap::new(),
            search_method,
            vector_score: None,
            keyword_score: None,
            combined_score: None,
            fused_score: None,
            rerank_score: None,
            original_rank: None,
            reranked_position: None,
            truncated: false,
        }
    }

    /// Set metadata
    pub fn with_metadata(mut self, metadata: IndexMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set vector score
    pub fn with_vector_score(mut self, score: f32) -> Self {
        self.vector_score = Some(score);
        self
    }

    /// Set keyword score
    pub fn with_keyword_score(mut self, score: f32) -> Self {
        self.keyword_score = Some(score);
        self
    }

    /// Set combined score
    pub fn with_combined_score(mut self, score: f32) -> Self {
        self.combined_score = Some(score);
        self
    }

    /// Set rerank score
    pub fn with_rerank_score(mut self, score: f32) -> Self {
        self.rerank_score = Some(score);
        self
    }

    /// Relevance used for filtering and ordering.
    ///
    /// Precedence: rerank, combined, vector, keyword, else `0.0`.
    pub fn relevance(&self) -> f32 {
        self.rerank_score
            .or(self.combined_score)
            .or(self.vector_score)
            .or(self.keyword_score)
            .unwrap_or(0.0)
    }

    /// Section heading from metadata, if any
    pub fn heading(&self) -> Option<&str> {
        self.metadata
            .get("heading")
            .and_then(Value::as_str)
            .filter(|h| !h.is_empty())
    }

    /// Fill scores this candidate lacks from another copy of the same chunk.
    pub fn merge_scores_from(&mut self, other: &Candidate) {
        self.vector_score = self.vector_score.or(other.vector_score);
        self.keyword_score = self.keyword_score.or(other.keyword_score);
        self.combined_score = self.combined_score.or(other.combined_score);
        self.rerank_score = self.rerank_score.or(other.rerank_score);
    }
}

use serde::Deserialize;
use serde::Serialize;

/// Search strategy issued against the document store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Embedding similarity only
    #[default]
    #[serde(alias = "vector_only")]
    Vector,
    /// Server-side fusion of vector and keyword search
    Hybrid,
    /// Full-text search only
    #[serde(alias = "keyword_only")]
    Keyword,
}

/// Configuration for candidate retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Strategy used when the caller does not pick one
    #[serde(default)]
    pub mode: SearchMode,

    /// Weight of the vector score in hybrid search (0.0 - 1.0)
    #[serde(default = "default_vector_weight")]
    pub vector_weight: f32,

    /// Weight of the keyword score in hybrid search (0.0 - 1.0)
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,

    /// Minimum vector similarity for a match (0.0 - 1.0)
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f32,

    /// Number of candidates requested from the store
    #[serde(default = "default_match_count")]
    pub match_count: usize,

    /// RRF constant for client-side fusion
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f32,
}

fn default_vector_weight() -> f32 {
    0.7
}

fn default_keyword_weight() -> f32 {
    0.3
}

fn default_match_threshold() -> f32 {
    0.3
}

fn default_match_count() -> usize {
    10
}

fn default_rrf_k() -> f32 {
    crate::fusion::DEFAULT_RRF_K
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::default(),
            vector_weight: default_vector_weight(),
            keyword_weight: default_keyword_weight(),
            match_threshold: default_match_threshold(),
            match_count: default_match_count(),
            rrf_k: default_rrf_k(),
        }
    }
}

impl SearchConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.vector_weight) {
            return Err(format!(
                "vector_weight must be in [0.0, 1.0], got {}",
                self.vector_weight
            ));
        }

        if !(0.0..=1.0).contains(&self.keyword_weight) {
            return Err(format!(
                "keyword_weight must be in [0.0, 1.0], got {}",
                self.keyword_weight
            ));
        }

        let total_weight = self.vector_weight + self.keyword_weight;
        if (total_weight - 1.0).abs() > 0.01 {
            return Err(format!(
                "vector_weight + keyword_weight must sum to 1.0, got {total_weight}"
            ));
        }

        if !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(format!(
                "match_threshold must be in [0.0, 1.0], got {}",
                self.match_threshold
            ));
        }

        if self.match_count == 0 {
            return Err("match_count must be > 0".to_string());
        }

        if self.rrf_k <= 0.0 {
            return Err(format!("rrf_k must be > 0, got {}", self.rrf_k));
        }

        Ok(())
    }

    /// Hybrid search with the default weights
    pub fn hybrid() -> Self {
        Self {
            mode: SearchMode::Hybrid,
            ..Default::default()
        }
    }

    /// Keyword-only search for exact-term lookups
    pub fn keyword() -> Self {
        Self {
            mode: SearchMode::Keyword,
            ..Default::default()
        }
    }
}

/// Which reranking backend to prefer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankBackend {
    /// Remote cross-encoder API, falling back to the local model
    #[default]
    #[serde(alias = "cohere")]
    Remote,
    /// Local cross-encoder only
    Local,
    /// Never rerank
    None,
}

/// Local cross-encoder models
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalRerankModel {
    /// BAAI bge-reranker-base
    #[default]
    BgeRerankerBase,
    /// Jina reranker v1 turbo (English)
    JinaRerankerV1TurboEn,
}

/// Remote rerank endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteRerankConfig {
    /// Base URL of a Cohere-compatible `/v1/rerank` API
    #[serde(default = "default_remote_base_url")]
    pub base_url: String,

    /// Model name sent with each request
    #[serde(default = "default_remote_model")]
    pub model: String,

    /// API key; falls back to `COHERE_API_KEY` when unset
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Per-request timeout
    #[serde(default = "default_remote_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_remote_base_url() -> String {
    "https://api.cohere.com".to_string()
}

fn default_remote_model() -> String {
    "rerank-english-v3.0".to_string()
}

fn default_remote_timeout_ms() -> u64 {
    10_000
}

impl Default for RemoteRerankConfig {
    fn default() -> Self {
        Self {
            base_url: default_remote_base_url(),
            model: default_remote_model(),
            api_key: None,
            timeout_ms: default_remote_timeout_ms(),
        }
    }
}

/// Configuration for cross-encoder reranking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankConfig {
    /// Rerank retrieved candidates at all
    #[serde(default)]
    pub enabled: bool,

    /// Preferred backend
    #[serde(default)]
    pub backend: RerankBackend,

    /// Maximum number of candidates sent to the cross-encoder
    #[serde(default = "default_candidate_window")]
    pub candidate_window: usize,

    /// Number of candidates kept after reranking
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Remote backend settings
    #[serde(default)]
    pub remote: RemoteRerankConfig,

    /// Local backend model
    #[serde(default)]
    pub local_model: LocalRerankModel,
}

fn default_candidate_window() -> usize {
    20
}

fn default_top_k() -> usize {
    5
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: RerankBackend::default(),
            candidate_window: default_candidate_window(),
            top_k: default_top_k(),
            remote: RemoteRerankConfig::default(),
            local_model: LocalRerankModel::default(),
        }
    }
}

impl RerankConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.candidate_window == 0 {
            return Err("candidate_window must be > 0".to_string());
        }

        if self.top_k == 0 {
            return Err("top_k must be > 0".to_string());
        }

        if self.top_k > self.candidate_window {
            return Err(format!(
                "top_k ({}) cannot exceed candidate_window ({})",
                self.top_k, self.candidate_window
            ));
        }

        if self.remote.timeout_ms == 0 {
            return Err("remote.timeout_ms must be > 0".to_string());
        }

        Ok(())
    }

    /// Reranking with the local model only
    pub fn local() -> Self {
        Self {
            enabled: true,
            backend: RerankBackend::Local,
            ..Default::default()
        }
    }
}

use serde::Deserialize;
use serde::Serialize;

/// Configuration for the context optimizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Token budget for the assembled context
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,

    /// Strip whitespace runs and boilerplate from each chunk
    #[serde(default = "default_true")]
    pub enable_compression: bool,

    /// Drop exact and near-duplicate chunks
    #[serde(default = "default_true")]
    pub enable_deduplication: bool,

    /// Drop chunks scoring below `min_relevance_score`
    #[serde(default = "default_true")]
    pub enable_relevance_filter: bool,

    /// Chunks below this relevance are dropped (0.0 - 1.0)
    #[serde(default = "default_min_relevance_score")]
    pub min_relevance_score: f32,

    /// Word-set Jaccard similarity above which a chunk is a near duplicate
    #[serde(default = "default_dedup_threshold")]
    pub dedup_threshold: f32,

    /// Case-insensitive regexes removed from chunk text during compression
    #[serde(default = "default_boilerplate_patterns")]
    pub boilerplate_patterns: Vec<String>,

    /// Smallest leftover budget worth filling with a truncated chunk
    #[serde(default = "default_min_truncation_tokens")]
    pub min_truncation_tokens: usize,

    /// Prefix of the per-block citation ids, e.g. `[bi-block-1]`
    #[serde(default = "default_citation_prefix")]
    pub citation_prefix: String,
}

fn default_max_context_tokens() -> usize {
    4000
}

fn default_true() -> bool {
    true
}

fn default_min_relevance_score() -> f32 {
    0.3
}

fn default_dedup_threshold() -> f32 {
    0.9
}

fn default_boilerplate_patterns() -> Vec<String> {
    [
        r"Click here to .*?\.",
        r"Learn more at .*?\.",
        r"For more information, visit .*?\.",
        r"Copyright \d{4}.*?\.",
        r"All rights reserved\.?",
    ]
    .iter()
    .map(|p| (*p).to_string())
    .collect()
}

fn default_min_truncation_tokens() -> usize {
    100
}

fn default_citation_prefix() -> String {
    "bi-block".to_string()
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: default_max_context_tokens(),
            enable_compression: true,
            enable_deduplication: true,
            enable_relevance_filter: true,
            min_relevance_score: default_min_relevance_score(),
            dedup_threshold: default_dedup_threshold(),
            boilerplate_patterns: default_boilerplate_patterns(),
            min_truncation_tokens: default_min_truncation_tokens(),
            citation_prefix: default_citation_prefix(),
        }
    }
}

impl ContextConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_context_tokens == 0 {
            return Err("max_context_tokens must be > 0".to_string());
        }

        if !(0.0..=1.0).contains(&self.min_relevance_score) {
            return Err(format!(
                "min_relevance_score must be in [0.0, 1.0], got {}",
                self.min_relevance_score
            ));
        }

        if !(0.0..=1.0).contains(&self.dedup_threshold) {
            return Err(format!(
                "dedup_threshold must be in [0.0, 1.0], got {}",
                self.dedup_threshold
            ));
        }

        if self.citation_prefix.trim().is_empty() {
            return Err("citation_prefix must not be empty".to_string());
        }

        Ok(())
    }

    /// Small budget for short answers
    pub fn compact() -> Self {
        Self {
            max_context_tokens: 1500,
            min_relevance_score: 0.4,
            ..Default::default()
        }
    }

    /// Keep chunks exactly as retrieved, only enforcing the budget
    pub fn passthrough() -> Self {
        Self {
            enable_compression: false,
            enable_deduplication: false,
            enable_relevance_filter: false,
            ..Default::default()
        }
    }
}

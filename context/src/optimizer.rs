use crate::config::ContextConfig;
use crate::error::ContextError;
use crate::error::Result;
use crate::text::CHARS_PER_TOKEN;
use crate::text::Compressor;
use crate::text::char_prefix;
use crate::text::estimate_tokens;
use crate::text::normalize_text;
use log::debug;
use log::info;
use ragctx_retrieval::Candidate;
use ragctx_utils_similarity::jaccard_similarity;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashSet;

const BLOCK_SEPARATOR: &str = "\n\n---\n\n";
const DEFAULT_SOURCE: &str = "Doc";

/// Formatted, budget-respecting context plus optimization metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedContext {
    /// Formatted context blocks
    pub content: String,

    /// Number of candidates received
    pub original_chunks: usize,

    /// Number of candidates in `content`
    pub optimized_chunks: usize,

    /// Token estimate of the raw candidate text
    pub original_tokens: usize,

    /// Token estimate of `content`
    pub optimized_tokens: usize,

    /// Token reduction in percent; negative when formatting outweighs savings
    pub compression_ratio: f32,

    /// Candidates dropped as exact or near duplicates
    pub removed_duplicates: usize,

    /// Candidates that made it into `content`, in output order
    pub chunks: Vec<Candidate>,
}

impl OptimizedContext {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Turns retrieved candidates into a single context string.
///
/// Stages run in a fixed order: deduplication, relevance filtering,
/// compression, token-budget truncation, formatting. Each stage except
/// formatting can be switched off through [`ContextConfig`].
pub struct ContextOptimizer {
    config: ContextConfig,
    compressor: Compressor,
}

impl ContextOptimizer {
    pub fn new(config: ContextConfig) -> Result<Self> {
        config.validate().map_err(ContextError::InvalidConfig)?;
        let compressor = Compressor::new(&config.boilerplate_patterns)?;
        Ok(Self { config, compressor })
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Run every stage over `candidates`.
    pub fn optimize(&self, candidates: Vec<Candidate>) -> OptimizedContext {
        let original_chunks = candidates.len();
        let original_tokens = estimate_tokens(
            &candidates
                .iter()
                .map(|c| c.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
        );

        debug!("Optimizing {original_chunks} chunks ({original_tokens} tokens)");

        let candidates = if self.config.enable_deduplication {
            self.deduplicate(candidates)
        } else {
            candidates
        };
        let removed_duplicates = original_chunks - candidates.len();

        let mut candidates = if self.config.enable_relevance_filter {
            self.filter_by_relevance(candidates)
        } else {
            candidates
        };

        if self.config.enable_compression {
            for candidate in &mut candidates {
                candidate.content = self.compressor.compress(&candidate.content);
            }
        }

        // The token budget always applies
        let chunks = self.truncate_to_budget(candidates);
        let content = self.format(&chunks);
        let optimized_tokens = estimate_tokens(&content);

        let compression_ratio = if original_tokens > 0 {
            (original_tokens as f32 - optimized_tokens as f32) / original_tokens as f32 * 100.0
        } else {
            0.0
        };

        info!(
            "Optimized context: {}/{original_chunks} chunks, {optimized_tokens} tokens ({compression_ratio:.1}% reduction)",
            chunks.len()
        );

        OptimizedContext {
            content,
            original_chunks,
            optimized_chunks: chunks.len(),
            original_tokens,
            optimized_tokens,
            compression_ratio,
            removed_duplicates,
            chunks,
        }
    }

    /// Drop exact normalized duplicates, then chunks whose word sets overlap
    /// an already kept chunk by more than the dedup threshold.
    pub fn deduplicate(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut kept_texts: Vec<String> = Vec::new();
        let mut kept = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let normalized = normalize_text(&candidate.content);

            if seen.contains(&normalized) {
                debug!("Dropping exact duplicate {}", candidate.id);
                continue;
            }

            let near_duplicate = kept_texts
                .iter()
                .any(|kept| jaccard_similarity(&normalized, kept) > self.config.dedup_threshold);
            if near_duplicate {
                debug!("Dropping near duplicate {}", candidate.id);
                continue;
            }

            seen.insert(normalized.clone());
            kept_texts.push(normalized);
            kept.push(candidate);
        }

        kept
    }

    /// Keep candidates whose relevance reaches the minimum score.
    pub fn filter_by_relevance(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let before = candidates.len();
        let filtered: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| c.relevance() >= self.config.min_relevance_score)
            .collect();

        if filtered.len() < before {
            debug!(
                "Relevance filter dropped {} chunks below {}",
                before - filtered.len(),
                self.config.min_relevance_score
            );
        }
        filtered
    }

    /// Greedily take the most relevant candidates that fit the budget.
    ///
    /// When the next candidate does not fit and more than
    /// `min_truncation_tokens` remain, a prefix of it fills the rest and is
    /// marked `truncated`. Selection stops at the first candidate that does
    /// not fit.
    pub fn truncate_to_budget(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        let budget = self.config.max_context_tokens;
        candidates.sort_by(|a, b| b.relevance().total_cmp(&a.relevance()));

        let total = candidates.len();
        let mut selected = Vec::with_capacity(total);
        let mut used_tokens = 0;

        for mut candidate in candidates {
            let tokens = estimate_tokens(&candidate.content);

            if used_tokens + tokens <= budget {
                used_tokens += tokens;
                selected.push(candidate);
                continue;
            }

            let remaining = budget - used_tokens;
            if remaining > self.config.min_truncation_tokens {
                let prefix = char_prefix(&candidate.content, remaining * CHARS_PER_TOKEN);
                candidate.content = format!("{prefix}...");
                candidate.truncated = true;
                used_tokens += remaining;
                selected.push(candidate);
            }
            break;
        }

        debug!(
            "Selected {}/{total} chunks using {used_tokens}/{budget} tokens",
            selected.len()
        );
        selected
    }

    /// Render candidates as citation blocks.
    pub fn format(&self, chunks: &[Candidate]) -> String {
        chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let source = if chunk.source.is_empty() {
                    DEFAULT_SOURCE
                } else {
                    chunk.source.as_str()
                };
                let heading = chunk
                    .heading()
                    .map(|h| format!("\nHeading: {h}"))
                    .unwrap_or_default();
                let score = chunk
                    .rerank_score
                    .map(|s| format!(" (Relevance: {s:.2})"))
                    .unwrap_or_default();

                format!(
                    "Source: {source}{heading}{score}\nID: [{}-{}]\nContent:\n{}",
                    self.config.citation_prefix,
                    i + 1,
                    chunk.content
                )
            })
            .collect::<Vec<_>>()
            .join(BLOCK_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use ragctx_retrieval::SearchMethod;
    use serde_json::Value;

    fn candidate(id: &str, content: &str, score: f32) -> Candidate {
        Candidate::new(id, content, "https://example.com/docs", SearchMethod::Vector)
            .with_vector_score(score)
    }

    fn optimizer(config: ContextConfig) -> ContextOptimizer {
        ContextOptimizer::new(config).unwrap()
    }

    fn ids(chunks: &[Candidate]) -> Vec<&str> {
        chunks.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_dedup_exact_after_normalization() {
        let optimizer = optimizer(ContextConfig::default());
        let kept = optimizer.deduplicate(vec![
            candidate("a", "Refunds take five days.", 0.9),
            candidate("b", "  refunds TAKE five days!! ", 0.8),
        ]);
        assert_eq!(ids(&kept), vec!["a"]);
    }

    #[test]
    fn test_dedup_near_duplicate() {
        let optimizer = optimizer(ContextConfig::default());
        let base = "one two three four five six seven eight nine ten eleven twelve";
        // 12 shared words out of 13 distinct: Jaccard ~0.92
        let near = format!("{base} thirteen");
        let kept = optimizer.deduplicate(vec![
            candidate("a", base, 0.9),
            candidate("b", &near, 0.8),
            candidate("c", "completely unrelated shipping information", 0.7),
        ]);
        assert_eq!(ids(&kept), vec!["a", "c"]);
    }

    #[test]
    fn test_dedup_keeps_moderate_overlap() {
        let optimizer = optimizer(ContextConfig::default());
        let kept = optimizer.deduplicate(vec![
            candidate("a", "reset your password from settings", 0.9),
            candidate("b", "reset your email from settings", 0.8),
        ]);
        assert_eq!(ids(&kept), vec!["a", "b"]);
    }

    #[test]
    fn test_relevance_filter() {
        let optimizer = optimizer(ContextConfig::default());
        let kept = optimizer.filter_by_relevance(vec![
            candidate("low", "x", 0.1),
            candidate("edge", "y", 0.3),
            candidate("high", "z", 0.9),
            Candidate::new("unscored", "w", "s", SearchMethod::Keyword),
        ]);
        assert_eq!(ids(&kept), vec!["edge", "high"]);
    }

    #[test]
    fn test_rerank_score_takes_precedence_in_filter() {
        let optimizer = optimizer(ContextConfig::default());
        let kept = optimizer.filter_by_relevance(vec![
            candidate("a", "x", 0.9).with_rerank_score(0.05),
            candidate("b", "y", 0.1).with_rerank_score(0.8),
        ]);
        assert_eq!(ids(&kept), vec!["b"]);
    }

    #[test]
    fn test_truncation_respects_budget() {
        let optimizer = optimizer(ContextConfig {
            max_context_tokens: 250,
            ..Default::default()
        });

        // 100 tokens each
        let text = "a".repeat(400);
        let selected = optimizer.truncate_to_budget(vec![
            candidate("c", &text, 0.5),
            candidate("a", &text, 0.9),
            candidate("b", &text, 0.7),
        ]);

        // a and b fit whole (200), 50 remain which is too little to fill
        assert_eq!(ids(&selected), vec!["a", "b"]);
        assert!(selected.iter().all(|c| !c.truncated));
    }

    #[test]
    fn test_truncation_fills_remaining_budget() {
        let optimizer = optimizer(ContextConfig {
            max_context_tokens: 400,
            ..Default::default()
        });

        let selected = optimizer.truncate_to_budget(vec![
            candidate("a", &"a".repeat(800), 0.9),
            candidate("b", &"b".repeat(2000), 0.8),
            candidate("c", &"c".repeat(40), 0.7),
        ]);

        // a uses 200 tokens; b is cut to the remaining 200 tokens and stops selection
        assert_eq!(ids(&selected), vec!["a", "b"]);
        assert!(!selected[0].truncated);
        assert!(selected[1].truncated);
        assert_eq!(selected[1].content, format!("{}...", "b".repeat(800)));
    }

    #[test]
    fn test_truncation_order_by_relevance() {
        let optimizer = optimizer(ContextConfig::default());
        let selected = optimizer.truncate_to_budget(vec![
            candidate("mid", "m", 0.5),
            candidate("top", "t", 0.9),
            candidate("tie", "x", 0.5),
        ]);
        assert_eq!(ids(&selected), vec!["top", "mid", "tie"]);
    }

    #[test]
    fn test_format_blocks() {
        let optimizer = optimizer(ContextConfig::default());

        let mut metadata = IndexMap::new();
        metadata.insert("heading".to_string(), Value::from("Refunds"));
        let first = candidate("1", "Refunds take five days.", 0.9)
            .with_metadata(metadata)
            .with_rerank_score(0.876);
        let mut second = candidate("2", "Shipping is free.", 0.8);
        second.source = String::new();

        let formatted = optimizer.format(&[first, second]);

        assert_eq!(
            formatted,
            "Source: https://example.com/docs\nHeading: Refunds (Relevance: 0.88)\n\
             ID: [bi-block-1]\nContent:\nRefunds take five days.\
             \n\n---\n\n\
             Source: Doc\nID: [bi-block-2]\nContent:\nShipping is free."
        );
    }

    #[test]
    fn test_optimize_metrics() {
        let optimizer = optimizer(ContextConfig::default());
        let context = optimizer.optimize(vec![
            candidate("a", "Refunds take five days.   Click here to learn more.", 0.9),
            candidate("b", "refunds take five days  click here to learn more!", 0.8),
            candidate("c", "Unrelated low score text", 0.1),
        ]);

        assert_eq!(context.original_chunks, 3);
        assert_eq!(context.removed_duplicates, 1);
        assert_eq!(context.optimized_chunks, 1);
        assert_eq!(ids(&context.chunks), vec!["a"]);
        assert_eq!(context.chunks[0].content, "Refunds take five days.");
        assert_eq!(context.optimized_tokens, estimate_tokens(&context.content));
        assert!(context.content.contains("ID: [bi-block-1]"));
    }

    #[test]
    fn test_optimize_empty() {
        let optimizer = optimizer(ContextConfig::default());
        let context = optimizer.optimize(Vec::new());
        assert!(context.is_empty());
        assert_eq!(context.content, "");
        assert_eq!(context.compression_ratio, 0.0);
    }

    #[test]
    fn test_stages_can_be_disabled() {
        let optimizer = optimizer(ContextConfig::passthrough());
        let context = optimizer.optimize(vec![
            candidate("a", "Same  text.", 0.0),
            candidate("b", "Same  text.", 0.0),
        ]);
        assert_eq!(context.removed_duplicates, 0);
        assert_eq!(ids(&context.chunks), vec!["a", "b"]);
        assert_eq!(context.chunks[0].content, "Same  text.");
    }

    #[test]
    fn test_relevance_filter_toggle() {
        let chunks = || {
            vec![
                candidate("low", "barely related paragraph", 0.05),
                candidate("high", "exactly what was asked", 0.9),
            ]
        };

        let filtered = optimizer(ContextConfig::default()).optimize(chunks());
        assert_eq!(ids(&filtered.chunks), vec!["high"]);

        let unfiltered = optimizer(ContextConfig {
            enable_relevance_filter: false,
            ..Default::default()
        })
        .optimize(chunks());
        assert_eq!(ids(&unfiltered.chunks), vec!["high", "low"]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = ContextOptimizer::new(ContextConfig {
            dedup_threshold: 2.0,
            ..Default::default()
        });
        assert!(matches!(result, Err(ContextError::InvalidConfig(_))));
    }
}

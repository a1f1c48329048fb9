use crate::error::PipelineError;
use crate::error::Result;
use ragctx_cache::CacheConfig;
use ragctx_context::ContextConfig;
use ragctx_embeddings::EmbeddingConfig;
use ragctx_retrieval::RerankConfig;
use ragctx_retrieval::SearchConfig;
use serde::Deserialize;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Settings for every stage of context assembly.
///
/// Each section falls back to its defaults when absent, so an empty TOML
/// document is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub rerank: RerankConfig,

    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl PipelineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| PipelineError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate every section, reporting the first failure.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("embedding", self.embedding.validate()),
            ("search", self.search.validate()),
            ("rerank", self.rerank.validate()),
            ("context", self.context.validate()),
            ("cache", self.cache.validate()),
        ];

        for (section, check) in checks {
            check.map_err(|message| PipelineError::InvalidConfig { section, message })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ragctx_retrieval::RerankBackend;
    use ragctx_retrieval::SearchMode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config.search.mode, SearchMode::Vector);
        assert_eq!(config.search.match_count, 10);
        assert!(!config.rerank.enabled);
        assert!(!config.cache.enabled);
        assert_eq!(config.context.max_context_tokens, 4000);
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
[search]
mode = "hybrid"
match_count = 8

[rerank]
enabled = true
backend = "local"

[cache]
enabled = true
similarity_threshold = 0.9
"#,
        )
        .unwrap();

        assert_eq!(config.search.mode, SearchMode::Hybrid);
        assert_eq!(config.search.match_count, 8);
        assert_eq!(config.search.vector_weight, 0.7);
        assert_eq!(config.rerank.backend, RerankBackend::Local);
        assert_eq!(config.cache.similarity_threshold, 0.9);
    }

    #[test]
    fn test_invalid_section_is_named() {
        let err = PipelineConfig::from_toml_str("[context]\nmax_context_tokens = 0\n")
            .err()
            .unwrap();
        assert!(matches!(
            err,
            PipelineError::InvalidConfig {
                section: "context",
                ..
            }
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[search]\nmode = \"keyword_only\"").unwrap();

        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.search.mode, SearchMode::Keyword);

        let missing = PipelineConfig::load(Path::new("/nonexistent/ragctx.toml"));
        assert!(matches!(missing, Err(PipelineError::ReadConfig { .. })));
    }

    #[test]
    fn test_render_round_trips() {
        let rendered = PipelineConfig::default().to_toml_string().unwrap();
        let parsed = PipelineConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(parsed.rerank.candidate_window, 20);
        assert_eq!(parsed.cache.sweep_interval, 100);
    }
}

use crate::DEFAULT_EMBEDDING_DIM;
use crate::bulk::BulkEmbedder;
use crate::error::EmbeddingError;
use crate::error::Result;
use crate::provider::EmbeddingProvider;
use crate::provider::TaskType;
use async_trait::async_trait;
use fastembed::EmbeddingModel;
use fastembed::InitOptions;
use fastembed::TextEmbedding;
use log::debug;
use log::info;
use serde::Deserialize;
use serde::Serialize;
use std::sync::Arc;
use std::sync::Mutex;

/// Configuration for the local embedding model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model to use for embeddings
    #[serde(default = "default_model")]
    pub model: EmbeddingModelType,

    /// Target embedding dimension (for Matryoshka truncation)
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Maximum batch size handed to the model in one call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Upper bound on concurrent embedding tasks during bulk embedding
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Show download progress when downloading models
    #[serde(default)]
    pub show_download_progress: bool,
}

fn default_model() -> EmbeddingModelType {
    EmbeddingModelType::NomicEmbedTextV15
}

fn default_dimension() -> usize {
    DEFAULT_EMBEDDING_DIM
}

fn default_batch_size() -> usize {
    10
}

fn default_max_workers() -> usize {
    3
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            dimension: default_dimension(),
            batch_size: default_batch_size(),
            max_workers: default_max_workers(),
            show_download_progress: false,
        }
    }
}

impl EmbeddingConfig {
    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.dimension == 0 {
            return Err("dimension must be > 0".to_string());
        }
        if self.batch_size == 0 {
            return Err("batch_size must be > 0".to_string());
        }
        if self.max_workers == 0 {
            return Err("max_workers must be > 0".to_string());
        }
        Ok(())
    }
}

/// Supported embedding models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbeddingModelType {
    /// Nomic-embed-text-v1.5 (asymmetric, uses task prefixes)
    NomicEmbedTextV15,
    /// All-MiniLM-L6-v2 (lightweight, symmetric)
    AllMiniLmL6V2,
}

impl EmbeddingModelType {
    fn to_fastembed_model(self) -> EmbeddingModel {
        match self {
            EmbeddingModelType::NomicEmbedTextV15 => EmbeddingModel::NomicEmbedTextV15,
            EmbeddingModelType::AllMiniLmL6V2 => EmbeddingModel::AllMiniLML6V2,
        }
    }

    fn uses_task_prefix(self) -> bool {
        matches!(self, EmbeddingModelType::NomicEmbedTextV15)
    }
}

/// Embedding provider backed by a local fastembed ONNX model.
///
/// Inference runs on the blocking thread pool so async callers are never
/// stalled by the model.
#[derive(Clone)]
pub struct FastembedProvider {
    model: Arc<Mutex<TextEmbedding>>,
    config: EmbeddingConfig,
}

impl FastembedProvider {
    /// Create a provider with default configuration
    pub async fn new() -> Result<Self> {
        Self::with_config(EmbeddingConfig::default()).await
    }

    /// Create a provider with custom configuration
    pub async fn with_config(config: EmbeddingConfig) -> Result<Self> {
        config.validate().map_err(EmbeddingError::InvalidInput)?;

        info!(
            "Initializing embedding model {:?}, dimension {}",
            config.model, config.dimension
        );

        let init_options = InitOptions::new(config.model.to_fastembed_model())
            .with_show_download_progress(config.show_download_progress);

        let model = tokio::task::spawn_blocking(move || TextEmbedding::try_new(init_options))
            .await?
            .map_err(|e| EmbeddingError::ModelInitialization(e.to_string()))?;

        info!("Embedding model initialized");

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            config,
        })
    }

    /// Embed many texts of the same task type in model-sized batches.
    pub async fn embed_batch(&self, texts: Vec<String>, task: TaskType) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let inputs: Vec<String> = if self.config.model.uses_task_prefix() {
            texts
                .into_iter()
                .map(|text| format!("{}{text}", task.nomic_prefix()))
                .collect()
        } else {
            texts
        };

        let model = Arc::clone(&self.model);
        let batch_size = self.config.batch_size;
        let dimension = self.config.dimension;

        let embeddings = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
            let model = model
                .lock()
                .map_err(|e| EmbeddingError::EmbeddingGeneration(e.to_string()))?;

            let mut all = Vec::with_capacity(inputs.len());
            for chunk in inputs.chunks(batch_size) {
                let refs: Vec<&str> = chunk.iter().map(String::as_str).collect();
                let batch = model
                    .embed(refs, None)
                    .map_err(|e| EmbeddingError::EmbeddingGeneration(e.to_string()))?;
                for mut embedding in batch {
                    if embedding.len() > dimension {
                        embedding.truncate(dimension);
                    }
                    all.push(embedding);
                }
            }
            Ok(all)
        })
        .await??;

        debug!("Generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }

    /// Get the configuration of this provider
    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    /// Bulk embedder sharing this model, limited to `config.max_workers`
    /// concurrent requests.
    pub fn bulk(&self) -> BulkEmbedder {
        BulkEmbedder::from_config(Arc::new(self.clone()), &self.config)
    }
}

#[async_trait]
impl EmbeddingProvider for FastembedProvider {
    async fn embed(&self, text: &str, task: TaskType) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("empty text".to_string()));
        }

        let mut embeddings = self.embed_batch(vec![text.to_string()], task).await?;
        embeddings
            .pop()
            .ok_or_else(|| EmbeddingError::EmbeddingGeneration("No embedding generated".into()))
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_valid() {
        let config = EmbeddingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_workers, 3);
        assert_eq!(config.batch_size, 10);
    }

    #[test]
    fn test_invalid_config() {
        let config = EmbeddingConfig {
            max_workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EmbeddingConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    #[ignore = "Requires downloading embedding model"]
    async fn test_embed_single() {
        let provider = FastembedProvider::new().await.unwrap();
        let embedding = provider
            .embed("how do I reset my password", TaskType::RetrievalQuery)
            .await
            .unwrap();
        assert_eq!(embedding.len(), DEFAULT_EMBEDDING_DIM);
    }

    #[tokio::test]
    #[ignore = "Requires downloading embedding model"]
    async fn test_custom_dimension() {
        let config = EmbeddingConfig {
            dimension: 256,
            ..Default::default()
        };
        let provider = FastembedProvider::with_config(config).await.unwrap();
        let embeddings = provider
            .embed_batch(
                vec!["first".to_string(), "second".to_string()],
                TaskType::RetrievalDocument,
            )
            .await
            .unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].len(), 256);
    }

    #[tokio::test]
    #[ignore = "Requires downloading embedding model"]
    async fn test_empty_input_rejected() {
        let provider = FastembedProvider::new().await.unwrap();
        let result = provider.embed("   ", TaskType::RetrievalQuery).await;
        assert!(matches!(result, Err(EmbeddingError::InvalidInput(_))));
    }

    #[tokio::test]
    #[ignore = "Requires downloading embedding model"]
    async fn test_bulk_from_provider() {
        let config = EmbeddingConfig {
            max_workers: 2,
            ..Default::default()
        };
        let provider = FastembedProvider::with_config(config).await.unwrap();
        let bulk = provider.bulk();
        assert_eq!(bulk.max_workers(), 2);

        let results = bulk
            .embed_all(
                vec!["first".to_string(), "second".to_string()],
                TaskType::RetrievalDocument,
            )
            .await;
        assert!(results.iter().all(Option::is_some));
    }
}

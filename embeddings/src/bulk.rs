use crate::provider::EmbeddingProvider;
use crate::provider::TaskType;
use crate::service::EmbeddingConfig;
use log::debug;
use log::warn;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Bulk embedding bound to the worker limit of an [`EmbeddingConfig`].
#[derive(Clone)]
pub struct BulkEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    max_workers: usize,
}

impl BulkEmbedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, max_workers: usize) -> Self {
        Self {
            provider,
            max_workers,
        }
    }

    pub fn from_config(provider: Arc<dyn EmbeddingProvider>, config: &EmbeddingConfig) -> Self {
        Self::new(provider, config.max_workers)
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// See [`embed_bounded`].
    pub async fn embed_all(&self, texts: Vec<String>, task: TaskType) -> Vec<Option<Vec<f32>>> {
        embed_bounded(Arc::clone(&self.provider), texts, task, self.max_workers).await
    }
}

/// Embed `texts` with at most `max_workers` requests in flight.
///
/// The returned vector is aligned with `texts`; an item whose embedding
/// failed is `None` and is logged. Every task is joined before returning.
pub async fn embed_bounded(
    provider: Arc<dyn EmbeddingProvider>,
    texts: Vec<String>,
    task: TaskType,
    max_workers: usize,
) -> Vec<Option<Vec<f32>>> {
    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let total = texts.len();

    let mut tasks = Vec::with_capacity(total);

    for (idx, text) in texts.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let provider = Arc::clone(&provider);

        let handle = tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    warn!("Embedding slot unavailable for item {idx}: {e}");
                    return None;
                }
            };

            match provider.embed(&text, task).await {
                Ok(embedding) => Some(embedding),
                Err(e) => {
                    warn!("Failed to embed item {idx}: {e}");
                    None
                }
            }
        });

        tasks.push(handle);
    }

    let mut results = Vec::with_capacity(total);
    for task in tasks {
        match task.await {
            Ok(result) => results.push(result),
            Err(e) => {
                warn!("Task join error: {e}");
                results.push(None);
            }
        }
    }

    let embedded = results.iter().filter(|r| r.is_some()).count();
    debug!("Embedded {embedded}/{total} texts");

    results
}

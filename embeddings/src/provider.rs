use crate::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

/// What an embedding will be used for.
///
/// Asymmetric models embed queries and documents differently, so callers
/// must say which side of the search a text sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// A search query issued at request time
    RetrievalQuery,
    /// A document chunk stored for later retrieval
    RetrievalDocument,
}

impl TaskType {
    /// Prefix the Nomic models expect in front of the input text.
    pub fn nomic_prefix(self) -> &'static str {
        match self {
            TaskType::RetrievalQuery => "search_query: ",
            TaskType::RetrievalDocument => "search_document: ",
        }
    }
}

/// Source of text embeddings.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str, task: TaskType) -> Result<Vec<f32>>;

    /// Dimension of the vectors this provider returns.
    fn dimension(&self) -> usize;
}

use crate::config::LocalRerankModel;
use crate::config::RemoteRerankConfig;
use crate::error::Result;
use crate::error::RetrievalError;
use async_trait::async_trait;
use fastembed::RerankInitOptions;
use fastembed::RerankerModel;
use fastembed::TextRerank;
use log::info;
use serde::Deserialize;
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;

/// One scored document from a remote rerank call
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RerankHit {
    /// Index into the documents sent with the request
    pub index: usize,
    /// Relevance in `[0, 1]`
    pub relevance_score: f32,
}

/// Remote cross-encoder service.
#[async_trait]
pub trait RemoteReranker: Send + Sync {
    /// Score `documents` against `query`, returning at most `top_n` hits.
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankHit>>;
}

/// In-process cross-encoder.
///
/// `predict` is blocking and returns raw logits aligned with `documents`.
pub trait CrossEncoder: Send + Sync {
    fn predict(&self, query: &str, documents: &[String]) -> Result<Vec<f32>>;
}

/// Maps a raw logit into `[0, 1]`.
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Client for a Cohere-compatible `POST /v1/rerank` endpoint.
pub struct HttpReranker {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl HttpReranker {
    pub fn new(config: &RemoteRerankConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    /// Build a client when an API key is configured or present in
    /// `COHERE_API_KEY`.
    pub fn from_config(config: &RemoteRerankConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("COHERE_API_KEY").ok())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| RetrievalError::MissingConfig("COHERE_API_KEY".to_string()))?;

        Self::new(config, api_key)
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankHit>,
}

#[async_trait]
impl RemoteReranker for HttpReranker {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankHit>> {
        let url = format!("{}/v1/rerank", self.base_url);
        let body = RerankRequest {
            model: &self.model,
            query,
            documents,
            top_n,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Reranking(format!(
                "rerank endpoint returned {status}: {body}"
            )));
        }

        let parsed: RerankResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::MalformedResponse(e.to_string()))?;

        Ok(parsed.results)
    }
}

impl LocalRerankModel {
    fn to_fastembed_model(self) -> RerankerModel {
        match self {
            LocalRerankModel::BgeRerankerBase => RerankerModel::BGERerankerBase,
            LocalRerankModel::JinaRerankerV1TurboEn => RerankerModel::JINARerankerV1TurboEn,
        }
    }
}

/// Local cross-encoder backed by a fastembed ONNX reranker.
pub struct FastembedCrossEncoder {
    model: Mutex<TextRerank>,
}

impl FastembedCrossEncoder {
    /// Load the model, downloading it on first use. Blocking.
    pub fn load(model: LocalRerankModel) -> Result<Self> {
        info!("Loading local cross-encoder {model:?}");

        let options = RerankInitOptions::new(model.to_fastembed_model());
        let model = TextRerank::try_new(options)
            .map_err(|e| RetrievalError::Reranking(format!("failed to load cross-encoder: {e}")))?;

        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

impl CrossEncoder for FastembedCrossEncoder {
    fn predict(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        let model = self
            .model
            .lock()
            .map_err(|e| RetrievalError::Reranking(e.to_string()))?;

        let docs: Vec<&str> = documents.iter().map(String::as_str).collect();
        let results = model
            .rerank(query, docs, false, None)
            .map_err(|e| RetrievalError::Reranking(e.to_string()))?;

        // fastembed returns results sorted by score; realign with the input
        let mut scores = vec![0.0; documents.len()];
        for result in results {
            if let Some(slot) = scores.get_mut(result.index) {
                *slot = result.score;
            }
        }
        Ok(scores)
    }
}

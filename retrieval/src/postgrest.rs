use crate::error::Result;
use crate::error::RetrievalError;
use crate::result::Candidate;
use crate::result::SearchMethod;
use crate::scope::normalize_scope;
use crate::store::DocumentStore;
use crate::store::HybridSearchRequest;
use crate::store::KeywordSearchRequest;
use crate::store::VectorSearchRequest;
use async_trait::async_trait;
use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

const VECTOR_SEARCH_FN: &str = "match_documents";
const KEYWORD_SEARCH_FN: &str = "keyword_search_documents";
const HYBRID_SEARCH_FN: &str = "hybrid_search_documents";

/// Connection settings for a PostgREST endpoint
#[derive(Debug, Clone)]
pub struct PostgrestConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub base_url: String,
    /// Service key sent as `apikey` and bearer token
    pub api_key: String,
    /// Per-request timeout
    pub timeout_ms: u64,
}

impl PostgrestConfig {
    /// Read `SUPABASE_URL` and `SUPABASE_KEY` from the environment
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("SUPABASE_URL")
            .map_err(|_| RetrievalError::MissingConfig("SUPABASE_URL".to_string()))?;
        let api_key = std::env::var("SUPABASE_KEY")
            .map_err(|_| RetrievalError::MissingConfig("SUPABASE_KEY".to_string()))?;

        Ok(Self {
            base_url,
            api_key,
            timeout_ms: 10_000,
        })
    }
}

/// [`DocumentStore`] backed by Postgres RPC functions exposed over PostgREST.
pub struct PostgrestStore {
    client: reqwest::Client,
    config: PostgrestConfig,
}

impl PostgrestStore {
    pub fn new(config: PostgrestConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self { client, config })
    }

    async fn call_rpc<P: Serialize + ?Sized>(
        &self,
        function: &str,
        params: &P,
    ) -> Result<Vec<DocumentRow>> {
        let url = format!(
            "{}/rest/v1/rpc/{function}",
            self.config.base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .json(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Store {
                status: status.as_u16(),
                body,
            });
        }

        let rows: Vec<DocumentRow> = response
            .json()
            .await
            .map_err(|e| RetrievalError::MalformedResponse(e.to_string()))?;

        debug!("RPC {function} returned {} rows", rows.len());
        Ok(rows)
    }
}

#[async_trait]
impl DocumentStore for PostgrestStore {
    async fn vector_search(&self, request: &VectorSearchRequest<'_>) -> Result<Vec<Candidate>> {
        let rows = self.call_rpc(VECTOR_SEARCH_FN, request).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let similarity = non_negative(row.similarity);
                row.into_candidate(SearchMethod::Vector)
                    .with_vector_score(similarity)
            })
            .collect())
    }

    async fn keyword_search(&self, request: &KeywordSearchRequest<'_>) -> Result<Vec<Candidate>> {
        let rows = self.call_rpc(KEYWORD_SEARCH_FN, request).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let rank = non_negative(row.rank.or(row.bm25_score));
                row.into_candidate(SearchMethod::Keyword)
                    .with_keyword_score(rank)
            })
            .collect())
    }

    async fn hybrid_search(&self, request: &HybridSearchRequest<'_>) -> Result<Vec<Candidate>> {
        let rows = self.call_rpc(HYBRID_SEARCH_FN, request).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let combined = non_negative(row.combined_score);
                let similarity = non_negative(row.similarity);
                let bm25 = non_negative(row.bm25_score);
                row.into_candidate(SearchMethod::Hybrid)
                    .with_combined_score(combined)
                    .with_vector_score(similarity)
                    .with_keyword_score(bm25)
            })
            .collect())
    }
}

fn non_negative(score: Option<f32>) -> f32 {
    score.unwrap_or(0.0).max(0.0)
}

/// One row returned by the search RPC functions
#[derive(Debug, Deserialize)]
struct DocumentRow {
    #[serde(deserialize_with = "deserialize_id")]
    id: String,
    #[serde(default)]
    content: String,
    #[serde(default, rename = "source_url", alias = "source")]
    source: Option<String>,
    #[serde(default, deserialize_with = "deserialize_metadata")]
    metadata: IndexMap<String, Value>,
    #[serde(default)]
    similarity: Option<f32>,
    #[serde(default)]
    rank: Option<f32>,
    #[serde(default)]
    bm25_score: Option<f32>,
    #[serde(default)]
    combined_score: Option<f32>,
}

impl DocumentRow {
    fn into_candidate(self, method: SearchMethod) -> Candidate {
        let source = self
            .source
            .as_deref()
            .map(normalize_scope)
            .unwrap_or_default();
        Candidate::new(self.id, self.content, source, method).with_metadata(self.metadata)
    }
}

/// Row ids are integers in most schemas but uuids in others.
fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "unsupported id type: {other}"
        ))),
    }
}

fn deserialize_metadata<'de, D>(
    deserializer: D,
) -> std::result::Result<IndexMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<IndexMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

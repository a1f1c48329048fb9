use crate::config::RerankBackend;
use crate::config::RerankConfig;
use crate::cross_encoder::CrossEncoder;
use crate::cross_encoder::FastembedCrossEncoder;
use crate::cross_encoder::HttpReranker;
use crate::cross_encoder::RemoteReranker;
use crate::cross_encoder::sigmoid;
use crate::error::Result;
use crate::error::RetrievalError;
use crate::result::Candidate;
use log::debug;
use log::info;
use log::warn;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

/// Deferred construction of the local cross-encoder. Runs on the blocking
/// pool at most once per [`Reranker`].
pub type LocalLoader = Box<dyn FnOnce() -> Result<Arc<dyn CrossEncoder>> + Send + 'static>;

/// Which backend the reranker currently uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RerankerState {
    /// Backends not yet initialized
    Uninitialized,
    /// Remote API available; local model may be loaded on failure
    PrimaryReady,
    /// Local cross-encoder in use
    LocalReady,
    /// No backend; reranking is passthrough
    Unavailable,
}

struct Backends {
    state: RerankerState,
    primary: Option<Arc<dyn RemoteReranker>>,
    local: Option<Arc<dyn CrossEncoder>>,
    loader: Option<LocalLoader>,
}

/// Cross-encoder reranking with automatic fallback
/// (remote API → local model → passthrough).
///
/// `rerank` never fails: whatever goes wrong, the caller gets a usable
/// ordering of the input.
pub struct Reranker {
    config: RerankConfig,
    backends: Mutex<Backends>,
}

impl Reranker {
    /// Create a reranker with the production backends chosen by `config`.
    ///
    /// The remote backend needs an API key; without one the local model is
    /// loaded instead.
    pub async fn new(config: RerankConfig) -> Self {
        let primary: Option<Arc<dyn RemoteReranker>> = match config.backend {
            RerankBackend::Remote => match HttpReranker::from_config(&config.remote) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    info!("Remote reranker unavailable: {e}");
                    None
                }
            },
            RerankBackend::Local | RerankBackend::None => None,
        };

        let local_model = config.local_model;
        let loader: LocalLoader = Box::new(move || {
            let encoder = FastembedCrossEncoder::load(local_model)?;
            Ok(Arc::new(encoder) as Arc<dyn CrossEncoder>)
        });

        Self::with_backends(config, primary, Some(loader)).await
    }

    /// Create a reranker from explicit backends.
    pub async fn with_backends(
        config: RerankConfig,
        primary: Option<Arc<dyn RemoteReranker>>,
        loader: Option<LocalLoader>,
    ) -> Self {
        let reranker = Self {
            config,
            backends: Mutex::new(Backends {
                state: RerankerState::Uninitialized,
                primary,
                local: None,
                loader,
            }),
        };
        reranker.initialize().await;
        reranker
    }

    async fn initialize(&self) {
        let needs_local = {
            let mut backends = self.lock();
            match self.config.backend {
                RerankBackend::None => {
                    backends.state = RerankerState::Unavailable;
                    false
                }
                RerankBackend::Remote if backends.primary.is_some() => {
                    backends.state = RerankerState::PrimaryReady;
                    false
                }
                RerankBackend::Remote | RerankBackend::Local => true,
            }
        };

        if needs_local {
            let state = if self.load_local().await.is_some() {
                RerankerState::LocalReady
            } else {
                RerankerState::Unavailable
            };
            self.lock().state = state;
        }

        info!("Reranker initialized: {:?}", self.state());
    }

    /// Current backend state
    pub fn state(&self) -> RerankerState {
        self.lock().state
    }

    pub fn config(&self) -> &RerankConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Backends> {
        match self.backends.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Return the local encoder, loading it on first call.
    async fn load_local(&self) -> Option<Arc<dyn CrossEncoder>> {
        let loader = {
            let mut backends = self.lock();
            if let Some(local) = &backends.local {
                return Some(Arc::clone(local));
            }
            backends.loader.take()?
        };

        let loaded = match tokio::task::spawn_blocking(loader).await {
            Ok(Ok(encoder)) => Some(encoder),
            Ok(Err(e)) => {
                warn!("Local cross-encoder failed to load: {e}");
                None
            }
            Err(e) => {
                warn!("Local cross-encoder load task failed: {e}");
                None
            }
        };

        if let Some(encoder) = &loaded {
            self.lock().local = Some(Arc::clone(encoder));
        }
        loaded
    }

    /// Rerank `documents` for `query`, keeping at most `top_k`.
    ///
    /// Only the first `candidate_window` documents are scored. Scored
    /// results carry `rerank_score`, `original_rank` and
    /// `reranked_position`; passthrough results are the input truncated to
    /// `top_k` and carry none of them.
    pub async fn rerank(
        &self,
        query: &str,
        mut documents: Vec<Candidate>,
        top_k: usize,
    ) -> Vec<Candidate> {
        if documents.is_empty() {
            return documents;
        }
        documents.truncate(self.config.candidate_window);

        let (state, primary) = {
            let backends = self.lock();
            (backends.state, backends.primary.clone())
        };

        let scored = match (state, primary) {
            (RerankerState::PrimaryReady, Some(primary)) => {
                match self.rerank_remote(primary.as_ref(), query, &documents, top_k).await {
                    Ok(scored) => Some(scored),
                    Err(e) => {
                        warn!("Remote rerank failed, trying local cross-encoder: {e}");
                        self.rerank_with_fallback(query, &documents, top_k).await
                    }
                }
            }
            (RerankerState::LocalReady, _) => self.rerank_local(query, &documents, top_k).await,
            _ => None,
        };

        match scored {
            Some(scored) => {
                log_top_results(&scored);
                scored
            }
            None => {
                debug!("Reranking unavailable, passing through {top_k} documents");
                documents.truncate(top_k);
                documents
            }
        }
    }

    async fn rerank_with_fallback(
        &self,
        query: &str,
        documents: &[Candidate],
        top_k: usize,
    ) -> Option<Vec<Candidate>> {
        self.load_local().await?;
        let scored = self.rerank_local(query, documents, top_k).await?;

        let mut backends = self.lock();
        if backends.state == RerankerState::PrimaryReady {
            info!("Reranker switched to local cross-encoder");
            backends.state = RerankerState::LocalReady;
        }
        Some(scored)
    }

    async fn rerank_remote(
        &self,
        primary: &dyn RemoteReranker,
        query: &str,
        documents: &[Candidate],
        top_k: usize,
    ) -> Result<Vec<Candidate>> {
        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let hits = primary.rerank(query, &texts, top_k).await?;

        if hits.is_empty() {
            return Err(RetrievalError::Reranking(
                "remote reranker returned no results".to_string(),
            ));
        }

        // First hit per index wins; out-of-range indices are dropped
        let mut seen = HashSet::with_capacity(hits.len());
        let scores: Vec<(usize, f32)> = hits
            .into_iter()
            .filter(|hit| hit.index < documents.len() && seen.insert(hit.index))
            .map(|hit| (hit.index, hit.relevance_score.clamp(0.0, 1.0)))
            .collect();

        Ok(apply_scores(documents, scores, top_k))
    }

    async fn rerank_local(
        &self,
        query: &str,
        documents: &[Candidate],
        top_k: usize,
    ) -> Option<Vec<Candidate>> {
        let encoder = self.lock().local.clone()?;
        let query = query.to_string();
        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();

        let task = tokio::task::spawn_blocking(move || encoder.predict(&query, &texts));
        let logits = match task.await {
            Ok(Ok(logits)) => logits,
            Ok(Err(e)) => {
                warn!("Local rerank failed: {e}");
                return None;
            }
            Err(e) => {
                warn!("Local rerank task failed: {e}");
                return None;
            }
        };

        if logits.len() != documents.len() {
            warn!(
                "Local rerank returned {} scores for {} documents",
                logits.len(),
                documents.len()
            );
            return None;
        }

        let scores = logits
            .into_iter()
            .enumerate()
            .map(|(idx, logit)| (idx, sigmoid(logit)))
            .collect();

        Some(apply_scores(documents, scores, top_k))
    }
}

/// Annotate and order documents by `(index, score)` pairs.
fn apply_scores(
    documents: &[Candidate],
    mut scores: Vec<(usize, f32)>,
    top_k: usize,
) -> Vec<Candidate> {
    // Ties keep the original order
    scores.sort_by_key(|(idx, _)| *idx);
    scores.sort_by(|a, b| b.1.total_cmp(&a.1));
    scores.truncate(top_k);

    scores
        .into_iter()
        .enumerate()
        .map(|(position, (idx, score))| {
            let mut candidate = documents[idx].clone();
            candidate.rerank_score = Some(score);
            candidate.original_rank = Some(idx + 1);
            candidate.reranked_position = Some(position + 1);
            candidate
        })
        .collect()
}

fn log_top_results(scored: &[Candidate]) {
    for candidate in scored.iter().take(3) {
        debug!(
            "  #{} (was #{}) score={:.3} id={}",
            candidate.reranked_position.unwrap_or_default(),
            candidate.original_rank.unwrap_or_default(),
            candidate.rerank_score.unwrap_or_default(),
            candidate.id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cross_encoder::RerankHit;
    use crate::result::SearchMethod;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    struct FailingRemote {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RemoteReranker for FailingRemote {
        async fn rerank(
            &self,
            _query: &str,
            _documents: &[String],
            _top_n: usize,
        ) -> Result<Vec<RerankHit>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(RetrievalError::Reranking("503 service unavailable".to_string()))
        }
    }

    /// Returns hits in reverse document order with descending scores.
    struct ReversingRemote;

    #[async_trait]
    impl RemoteReranker for ReversingRemote {
        async fn rerank(
            &self,
            _query: &str,
            documents: &[String],
            top_n: usize,
        ) -> Result<Vec<RerankHit>> {
            Ok((0..documents.len())
                .rev()
                .enumerate()
                .map(|(pos, index)| RerankHit {
                    index,
                    relevance_score: 1.0 - pos as f32 * 0.1,
                })
                .take(top_n)
                .collect())
        }
    }

    /// Replays a fixed response regardless of the documents sent.
    struct CannedRemote(Vec<RerankHit>);

    #[async_trait]
    impl RemoteReranker for CannedRemote {
        async fn rerank(
            &self,
            _query: &str,
            _documents: &[String],
            _top_n: usize,
        ) -> Result<Vec<RerankHit>> {
            Ok(self.0.clone())
        }
    }

    /// Scores a document by the number leading its content.
    struct LeadingNumberEncoder;

    impl CrossEncoder for LeadingNumberEncoder {
        fn predict(&self, _query: &str, documents: &[String]) -> Result<Vec<f32>> {
            Ok(documents
                .iter()
                .map(|d| d.split(':').next().and_then(|n| n.parse().ok()).unwrap_or(0.0))
                .collect())
        }
    }

    fn loader_counting(loads: Arc<AtomicUsize>) -> LocalLoader {
        Box::new(move || {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(LeadingNumberEncoder) as Arc<dyn CrossEncoder>)
        })
    }

    fn failing_loader() -> LocalLoader {
        Box::new(|| Err(RetrievalError::Reranking("model missing".to_string())))
    }

    fn docs(logits: &[i32]) -> Vec<Candidate> {
        logits
            .iter()
            .enumerate()
            .map(|(i, logit)| {
                Candidate::new(
                    format!("d{i}"),
                    format!("{logit}: document {i}"),
                    "https://example.com",
                    SearchMethod::Vector,
                )
            })
            .collect()
    }

    fn enabled_config() -> RerankConfig {
        RerankConfig {
            enabled: true,
            ..Default::default()
        }
    }

    fn ids(results: &[Candidate]) -> Vec<&str> {
        results.iter().map(|c| c.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_primary_ready() {
        let reranker =
            Reranker::with_backends(enabled_config(), Some(Arc::new(ReversingRemote)), None).await;
        assert_eq!(reranker.state(), RerankerState::PrimaryReady);

        let results = reranker.rerank("q", docs(&[1, 2, 3]), 2).await;

        assert_eq!(ids(&results), vec!["d2", "d1"]);
        assert_eq!(results[0].rerank_score, Some(1.0));
        assert_eq!(results[0].original_rank, Some(3));
        assert_eq!(results[0].reranked_position, Some(1));
        assert_eq!(results[1].original_rank, Some(2));
        assert_eq!(results[1].reranked_position, Some(2));
    }

    #[test_log::test(tokio::test)]
    async fn test_primary_failure_falls_back_to_local() {
        let loads = Arc::new(AtomicUsize::new(0));
        let remote = Arc::new(FailingRemote {
            calls: AtomicUsize::new(0),
        });
        let reranker = Reranker::with_backends(
            enabled_config(),
            Some(Arc::clone(&remote) as Arc<dyn RemoteReranker>),
            Some(loader_counting(Arc::clone(&loads))),
        )
        .await;
        assert_eq!(reranker.state(), RerankerState::PrimaryReady);
        assert_eq!(loads.load(Ordering::SeqCst), 0);

        let results = reranker.rerank("q", docs(&[-2, 3, 0]), 3).await;

        assert_eq!(ids(&results), vec!["d1", "d2", "d0"]);
        assert!((results[0].rerank_score.unwrap() - sigmoid(3.0)).abs() < 1e-6);
        assert!((results[1].rerank_score.unwrap() - 0.5).abs() < 1e-6);
        assert_eq!(results[0].original_rank, Some(2));
        assert_eq!(results[2].reranked_position, Some(3));
        assert_eq!(reranker.state(), RerankerState::LocalReady);

        // Stays local: the remote is not called again and the model is not reloaded
        reranker.rerank("q", docs(&[1, 2]), 2).await;
        assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_both_unavailable_passthrough() {
        let reranker = Reranker::with_backends(
            enabled_config(),
            Some(Arc::new(FailingRemote {
                calls: AtomicUsize::new(0),
            })),
            Some(failing_loader()),
        )
        .await;

        let input = docs(&[5, 4, 3, 2]);
        let results = reranker.rerank("q", input.clone(), 2).await;

        assert_eq!(results, input[..2].to_vec());
        assert!(results.iter().all(|c| c.rerank_score.is_none()));
        assert!(results.iter().all(|c| c.original_rank.is_none()));
        assert_eq!(reranker.state(), RerankerState::PrimaryReady);
    }

    #[test_log::test(tokio::test)]
    async fn test_no_primary_loads_local_at_construction() {
        let loads = Arc::new(AtomicUsize::new(0));
        let reranker = Reranker::with_backends(
            enabled_config(),
            None,
            Some(loader_counting(Arc::clone(&loads))),
        )
        .await;

        assert_eq!(reranker.state(), RerankerState::LocalReady);
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        let results = reranker.rerank("q", docs(&[0, 7]), 5).await;
        assert_eq!(ids(&results), vec!["d1", "d0"]);
    }

    #[tokio::test]
    async fn test_nothing_available() {
        let reranker = Reranker::with_backends(enabled_config(), None, Some(failing_loader())).await;
        assert_eq!(reranker.state(), RerankerState::Unavailable);

        let results = reranker.rerank("q", docs(&[1, 2, 3]), 2).await;
        assert_eq!(ids(&results), vec!["d0", "d1"]);
    }

    #[tokio::test]
    async fn test_backend_none_is_unavailable() {
        let loads = Arc::new(AtomicUsize::new(0));
        let config = RerankConfig {
            backend: RerankBackend::None,
            ..enabled_config()
        };
        let reranker = Reranker::with_backends(
            config,
            Some(Arc::new(ReversingRemote)),
            Some(loader_counting(Arc::clone(&loads))),
        )
        .await;

        assert_eq!(reranker.state(), RerankerState::Unavailable);
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_local_backend_skips_primary() {
        let config = RerankConfig {
            backend: RerankBackend::Local,
            ..enabled_config()
        };
        let reranker = Reranker::with_backends(
            config,
            Some(Arc::new(ReversingRemote)),
            Some(loader_counting(Arc::new(AtomicUsize::new(0)))),
        )
        .await;
        assert_eq!(reranker.state(), RerankerState::LocalReady);
    }

    #[tokio::test]
    async fn test_candidate_window_caps_input() {
        let config = RerankConfig {
            candidate_window: 3,
            top_k: 3,
            ..enabled_config()
        };
        let reranker = Reranker::with_backends(
            config,
            None,
            Some(loader_counting(Arc::new(AtomicUsize::new(0)))),
        )
        .await;

        // d4 would score highest but sits outside the window
        let results = reranker.rerank("q", docs(&[1, 2, 3, 4, 9]), 5).await;
        assert_eq!(ids(&results), vec!["d2", "d1", "d0"]);
    }

    #[tokio::test]
    async fn test_ties_preserve_original_order() {
        let reranker = Reranker::with_backends(
            enabled_config(),
            None,
            Some(loader_counting(Arc::new(AtomicUsize::new(0)))),
        )
        .await;

        let results = reranker.rerank("q", docs(&[1, 1, 1]), 3).await;
        assert_eq!(ids(&results), vec!["d0", "d1", "d2"]);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let reranker =
            Reranker::with_backends(enabled_config(), Some(Arc::new(ReversingRemote)), None).await;
        assert!(reranker.rerank("q", Vec::new(), 5).await.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_remote_index_kept_once() {
        let hit = |index, relevance_score| RerankHit {
            index,
            relevance_score,
        };
        let remote = CannedRemote(vec![hit(1, 0.9), hit(1, 0.8), hit(7, 0.99), hit(0, 0.5)]);
        let reranker =
            Reranker::with_backends(enabled_config(), Some(Arc::new(remote)), None).await;

        let results = reranker.rerank("q", docs(&[1, 2, 3]), 3).await;

        assert_eq!(ids(&results), vec!["d1", "d0"]);
        assert_eq!(results[0].rerank_score, Some(0.9));
        assert_eq!(results[1].reranked_position, Some(2));
    }
}

use crate::config::CacheBackend;
use crate::config::CacheConfig;
use crate::config::TtlClass;
use crate::error::CacheError;
use crate::error::Result;
use crate::key::cache_key;
use log::debug;
use log::info;
use log::warn;
use ragctx_utils_similarity::cosine_similarity;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;
use std::time::Instant;

struct CacheEntry<V> {
    query: String,
    embedding: Vec<f32>,
    value: V,
    scope: Option<String>,
    ttl_class: TtlClass,
    ttl: Duration,
    created_at: Instant,
    last_accessed: Instant,
    hit_count: u64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= self.ttl
    }

    fn record_hit(&mut self, now: Instant) {
        self.hit_count += 1;
        self.last_accessed = now;
    }
}

struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    hits: u64,
    misses: u64,
    evictions: u64,
    total_queries: u64,
}

impl<V> CacheState<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
            evictions: 0,
            total_queries: 0,
        }
    }

    fn sweep(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - self.entries.len();
        self.evictions += removed as u64;
        removed
    }
}

/// Counters reported by [`SemanticCache::stats`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub total_queries: u64,
    pub size: usize,
    /// `hits / (hits + misses)`, 0 before the first lookup
    pub hit_rate: f64,
}

/// Read-only view of one entry, see [`SemanticCache::peek`]
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySnapshot {
    pub query: String,
    pub scope: Option<String>,
    pub ttl_class: TtlClass,
    pub hit_count: u64,
    pub age: Duration,
    pub idle: Duration,
}

/// Query-level result cache keyed by `(query, scope)` with a semantic
/// fallback.
///
/// Lookups try the exact key first, then the unexpired entry of the same
/// scope whose stored query embedding is most similar to the probe. One
/// mutex guards the entries and the counters, so a lookup, an insert and a
/// sweep never interleave.
pub struct SemanticCache<V> {
    enabled: bool,
    similarity_threshold: f32,
    sweep_interval: u64,
    general_ttl: Duration,
    indexed_ttl: Duration,
    state: Mutex<CacheState<V>>,
}

impl<V: Clone> SemanticCache<V> {
    pub fn new(config: &CacheConfig) -> Result<Self> {
        config.validate().map_err(CacheError::InvalidConfig)?;

        let enabled = match (config.enabled, config.backend) {
            (false, _) => false,
            (true, CacheBackend::Memory) => true,
            (true, CacheBackend::Redis) => {
                warn!("Redis cache backend is not available, caching disabled");
                false
            }
        };

        if enabled {
            info!(
                "Semantic cache enabled (threshold {}, general TTL {}s, indexed TTL {}s)",
                config.similarity_threshold, config.general_ttl_secs, config.indexed_ttl_secs
            );
        }

        Ok(Self {
            enabled,
            similarity_threshold: config.similarity_threshold,
            sweep_interval: config.sweep_interval,
            general_ttl: config.ttl(TtlClass::General),
            indexed_ttl: config.ttl(TtlClass::Indexed),
            state: Mutex::new(CacheState::new()),
        })
    }

    /// A cache that never stores anything
    pub fn disabled() -> Self {
        let config = CacheConfig::default();
        Self {
            enabled: false,
            similarity_threshold: config.similarity_threshold,
            sweep_interval: config.sweep_interval,
            general_ttl: config.ttl(TtlClass::General),
            indexed_ttl: config.ttl(TtlClass::Indexed),
            state: Mutex::new(CacheState::new()),
        }
    }

    /// Override the lifetime of one TTL class
    pub fn with_ttl(mut self, class: TtlClass, ttl: Duration) -> Self {
        match class {
            TtlClass::General => self.general_ttl = ttl,
            TtlClass::Indexed => self.indexed_ttl = ttl,
        }
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Look up a cached value for `query` within `scope`.
    pub fn get(&self, query: &str, embedding: &[f32], scope: Option<&str>) -> Option<V> {
        if !self.enabled {
            return None;
        }

        let now = Instant::now();
        let mut state = self.lock();
        state.total_queries += 1;

        if state.total_queries % self.sweep_interval == 0 {
            let removed = state.sweep(now);
            if removed > 0 {
                debug!("Cache sweep removed {removed} expired entries");
            }
        }

        let key = cache_key(query, scope);
        let exact_expired = state
            .entries
            .get(&key)
            .map(|entry| entry.is_expired(now));

        match exact_expired {
            Some(false) => {
                if let Some(entry) = state.entries.get_mut(&key) {
                    entry.record_hit(now);
                    let value = entry.value.clone();
                    state.hits += 1;
                    debug!("Cache hit (exact) for query: {query}");
                    return Some(value);
                }
            }
            Some(true) => {
                state.entries.remove(&key);
                state.evictions += 1;
            }
            None => {}
        }

        let best = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.scope.as_deref() == scope && !entry.is_expired(now))
            .map(|(key, entry)| (key, cosine_similarity(embedding, &entry.embedding)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .filter(|(_, similarity)| *similarity >= self.similarity_threshold)
            .map(|(key, similarity)| (key.clone(), similarity));

        let hit = best.and_then(|(best_key, similarity)| {
            let entry = state.entries.get_mut(&best_key)?;
            entry.record_hit(now);
            debug!(
                "Cache hit (semantic, {similarity:.3}) for query: {query} ~ {}",
                entry.query
            );
            Some(entry.value.clone())
        });

        match hit {
            Some(value) => {
                state.hits += 1;
                Some(value)
            }
            None => {
                state.misses += 1;
                None
            }
        }
    }

    /// Store `value` under the general TTL class.
    pub fn set(&self, query: &str, embedding: Vec<f32>, value: V, scope: Option<&str>) {
        self.set_with_ttl(query, embedding, value, scope, TtlClass::General);
    }

    /// Store `value`, replacing any entry with the same `(query, scope)`.
    pub fn set_with_ttl(
        &self,
        query: &str,
        embedding: Vec<f32>,
        value: V,
        scope: Option<&str>,
        ttl_class: TtlClass,
    ) {
        if !self.enabled {
            return;
        }

        let now = Instant::now();
        let entry = CacheEntry {
            query: query.to_string(),
            embedding,
            value,
            scope: scope.map(str::to_string),
            ttl_class,
            ttl: self.ttl(ttl_class),
            created_at: now,
            last_accessed: now,
            hit_count: 0,
        };

        self.lock().entries.insert(cache_key(query, scope), entry);
    }

    /// Snapshot of the exact entry for `(query, scope)` without counting a
    /// lookup. Expired entries are not reported.
    pub fn peek(&self, query: &str, scope: Option<&str>) -> Option<EntrySnapshot> {
        let now = Instant::now();
        let state = self.lock();
        let entry = state.entries.get(&cache_key(query, scope))?;
        if entry.is_expired(now) {
            return None;
        }

        Some(EntrySnapshot {
            query: entry.query.clone(),
            scope: entry.scope.clone(),
            ttl_class: entry.ttl_class,
            hit_count: entry.hit_count,
            age: now.saturating_duration_since(entry.created_at),
            idle: now.saturating_duration_since(entry.last_accessed),
        })
    }

    /// Remove the entries of one scope, or every entry when `scope` is
    /// `None`. Returns how many were removed.
    pub fn invalidate(&self, scope: Option<&str>) -> usize {
        let mut state = self.lock();
        let before = state.entries.len();

        match scope {
            None => state.entries.clear(),
            Some(scope) => state
                .entries
                .retain(|_, entry| entry.scope.as_deref() != Some(scope)),
        }

        let removed = before - state.entries.len();
        info!("Invalidated {removed} cache entries");
        removed
    }

    /// Remove every expired entry now instead of waiting for the next sweep.
    pub fn purge_expired(&self) -> usize {
        self.lock().sweep(Instant::now())
    }

    /// Drop all entries and reset the counters.
    pub fn clear(&self) {
        *self.lock() = CacheState::new();
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        let lookups = state.hits + state.misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            state.hits as f64 / lookups as f64
        };

        CacheStats {
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            total_queries: state.total_queries,
            size: state.entries.len(),
            hit_rate,
        }
    }

    fn ttl(&self, class: TtlClass) -> Duration {
        match class {
            TtlClass::General => self.general_ttl,
            TtlClass::Indexed => self.indexed_ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<V>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;

/// Where cached contexts live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    /// In-process map guarded by a mutex
    #[default]
    Memory,
    /// External store. Not available in this build; a cache configured with
    /// it runs disabled.
    Redis,
}

/// Lifetime class of a cached entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TtlClass {
    /// Ordinary query results
    #[default]
    General,
    /// Results over freshly indexed content that changes rarely
    Indexed,
}

/// Configuration for the semantic cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub backend: CacheBackend,

    /// Lifetime of `TtlClass::General` entries in seconds
    #[serde(default = "default_general_ttl_secs")]
    pub general_ttl_secs: u64,

    /// Lifetime of `TtlClass::Indexed` entries in seconds
    #[serde(default = "default_indexed_ttl_secs")]
    pub indexed_ttl_secs: u64,

    /// Cosine similarity at or above which a different query is a hit
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Expired entries are swept every this many lookups
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: u64,
}

fn default_general_ttl_secs() -> u64 {
    3600
}

fn default_indexed_ttl_secs() -> u64 {
    86400
}

fn default_similarity_threshold() -> f32 {
    0.95
}

fn default_sweep_interval() -> u64 {
    100
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: CacheBackend::Memory,
            general_ttl_secs: default_general_ttl_secs(),
            indexed_ttl_secs: default_indexed_ttl_secs(),
            similarity_threshold: default_similarity_threshold(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

impl CacheConfig {
    /// Enabled in-memory cache with default TTLs
    pub fn memory() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }

    pub fn ttl(&self, class: TtlClass) -> Duration {
        match class {
            TtlClass::General => Duration::from_secs(self.general_ttl_secs),
            TtlClass::Indexed => Duration::from_secs(self.indexed_ttl_secs),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(format!(
                "similarity_threshold must be in [0.0, 1.0], got {}",
                self.similarity_threshold
            ));
        }

        if self.sweep_interval == 0 {
            return Err("sweep_interval must be > 0".to_string());
        }

        if self.general_ttl_secs == 0 || self.indexed_ttl_secs == 0 {
            return Err("TTLs must be > 0 seconds".to_string());
        }

        Ok(())
    }
}

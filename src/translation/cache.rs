/*!
 * Translation caching functionality.
 *
 * Maps `(source text, target language)` to a previously produced translation
 * so retries and re-runs do not repeat provider calls. Backends:
 * - `MemoryCache`: process-wide map with per-entry expiry
 * - `SqliteCache` (see `database`): persistent store shared across runs
 * - `NoopCache`: caching switched off or backend unavailable
 *
 * Backend failures are reported as `CacheError` and never fail a run.
 */

use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::app_config::{CacheBackend, CacheConfig};
use crate::database::SqliteCache;
use crate::errors::CacheError;

/// Default validity of a cache entry
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Entry count at which `MemoryCache::store` sweeps out expired entries
const MEMORY_PURGE_THRESHOLD: usize = 4096;

/// Separator between the source text and the language in the hashed key
const KEY_SEPARATOR: u8 = 0x1f;

/// Derive the cache key for a `(source text, target language)` pair.
///
/// SHA-256 over the length-prefixed UTF-8 text, a separator and the language,
/// hex encoded. The length prefix keeps `("a_", "b")` and `("a", "_b")` apart.
pub fn cache_key(source_text: &str, target_language: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update((source_text.len() as u64).to_le_bytes());
    hasher.update(source_text.as_bytes());
    hasher.update([KEY_SEPARATOR]);
    hasher.update(target_language.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Storage for translations keyed by content
///
/// Implementations must allow concurrent `lookup` and `store` from many
/// workers; each operation is atomic per key.
#[async_trait]
pub trait TranslationCache: Send + Sync + Debug {
    /// Look up a translation that has not expired
    async fn lookup(
        &self,
        source_text: &str,
        target_language: &str,
    ) -> Result<Option<String>, CacheError>;

    /// Store a translation valid for `ttl`
    async fn store(
        &self,
        source_text: &str,
        target_language: &str,
        translated_text: &str,
        ttl: Duration,
    ) -> Result<(), CacheError>;
}

/// Cache that never stores anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

#[async_trait]
impl TranslationCache for NoopCache {
    async fn lookup(&self, _: &str, _: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn store(&self, _: &str, _: &str, _: &str, _: Duration) -> Result<(), CacheError> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    translated_text: String,
    expires_at: Instant,
}

/// In-memory translation cache with expiring entries
///
/// Expired entries are dropped whenever a store brings the map to the purge
/// threshold, so a long folder job does not keep every stale translation.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    /// Entries by hashed key
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,

    /// Cache hit counter
    hits: Arc<AtomicUsize>,

    /// Cache miss counter
    misses: Arc<AtomicUsize>,

    /// Size that triggers an expiry sweep on store
    purge_threshold: usize,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_purge_threshold(MEMORY_PURGE_THRESHOLD)
    }
}

impl MemoryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache that sweeps expired entries once it holds `threshold`
    pub fn with_purge_threshold(threshold: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            hits: Arc::new(AtomicUsize::new(0)),
            misses: Arc::new(AtomicUsize::new(0)),
            purge_threshold: threshold.max(1),
        }
    }

    /// Get cache statistics as `(hits, misses, hit_rate)`
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        (hits, misses, hit_rate)
    }

    /// Drop expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        remove_expired(&mut self.entries.write())
    }

    /// Clear the cache and its counters
    pub fn clear(&self) {
        self.entries.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        debug!("Translation cache cleared");
    }

    /// Get the number of entries in the cache, expired ones included
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl TranslationCache for MemoryCache {
    async fn lookup(
        &self,
        source_text: &str,
        target_language: &str,
    ) -> Result<Option<String>, CacheError> {
        let key = cache_key(source_text, target_language);
        let now = Instant::now();

        let found = self
            .entries
            .read()
            .get(&key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.translated_text.clone());

        match &found {
            Some(_) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for '{}' (-> {})", truncate_text(source_text, 30), target_language);
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss for '{}' (-> {})", truncate_text(source_text, 30), target_language);
            }
        }

        Ok(found)
    }

    async fn store(
        &self,
        source_text: &str,
        target_language: &str,
        translated_text: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let key = cache_key(source_text, target_language);
        let entry = CacheEntry {
            translated_text: translated_text.to_string(),
            expires_at: Instant::now() + ttl,
        };

        let mut entries = self.entries.write();
        entries.insert(key, entry);
        if entries.len() >= self.purge_threshold {
            let removed = remove_expired(&mut entries);
            debug!("Swept {} expired entries from the translation cache", removed);
        }

        debug!("Cached translation for '{}' (-> {})", truncate_text(source_text, 30), target_language);
        Ok(())
    }
}

fn remove_expired(entries: &mut HashMap<String, CacheEntry>) -> usize {
    let now = Instant::now();
    let before = entries.len();
    entries.retain(|_, entry| entry.expires_at > now);
    before - entries.len()
}

/// Build the configured cache backend.
///
/// A persistent backend that cannot be opened degrades to `NoopCache`.
pub fn create_cache(config: &CacheConfig) -> Arc<dyn TranslationCache> {
    match config.backend {
        CacheBackend::Disabled => Arc::new(NoopCache),
        CacheBackend::Memory => Arc::new(MemoryCache::new()),
        CacheBackend::Sqlite => {
            let opened = match &config.path {
                Some(path) => SqliteCache::open(path),
                None => SqliteCache::open_default(),
            };

            match opened {
                Ok(cache) => Arc::new(cache),
                Err(e) => {
                    warn!("Translation cache unavailable, continuing without cache: {}", e);
                    Arc::new(NoopCache)
                }
            }
        }
    }
}

/// Truncate text to a maximum number of characters with ellipsis
pub(crate) fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

use std::hash::Hash;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use tracing::debug;

use crate::data::RawDocument;
use crate::errors::PipelineError;
use crate::store::DocumentStore;
use crate::types::{CollectionPath, DocumentId};

/// Thread-safe memo table whose entries expire a fixed duration after insertion.
#[derive(Clone)]
pub struct TtlCache<K, V> {
    inner: Arc<RwLock<TtlCacheInner<K, V>>>,
}

/// Internal mutable cache storage behind `TtlCache` locks.
struct TtlCacheInner<K, V> {
    entries: IndexMap<K, CachedEntry<V>>,
    ttl: Duration,
    stats: CacheStats,
}

/// Internal cache entry plus insertion time.
struct CachedEntry<V> {
    value: V,
    stored_at: Instant,
}

/// Hit/miss counters for a cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create a cache whose entries live for `ttl`. A zero `ttl` never serves a hit.
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(TtlCacheInner {
                entries: IndexMap::new(),
                ttl,
                stats: CacheStats::default(),
            })),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.read().expect("ttl cache poisoned").ttl
    }

    /// Live value for `key`, if one was stored less than `ttl` ago.
    pub fn get(&self, key: &K) -> Option<V> {
        let inner = self.inner.read().expect("ttl cache poisoned");
        inner
            .entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < inner.ttl)
            .map(|entry| entry.value.clone())
    }

    pub fn insert(&self, key: K, value: V) {
        let mut inner = self.inner.write().expect("ttl cache poisoned");
        inner.evict_expired();
        inner.entries.insert(
            key,
            CachedEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Return the live value for `key`, or compute, store, and return it.
    ///
    /// Errors from `compute` are returned as-is and not cached.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.get(&key) {
            self.inner.write().expect("ttl cache poisoned").stats.hits += 1;
            return Ok(value);
        }
        self.inner.write().expect("ttl cache poisoned").stats.misses += 1;
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// Drop every entry, forcing the next lookups to recompute.
    pub fn clear(&self) {
        let mut inner = self.inner.write().expect("ttl cache poisoned");
        inner.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.read().expect("ttl cache poisoned").stats
    }

    /// Number of stored entries, expired ones included until the next insert.
    pub fn len(&self) -> usize {
        self.inner.read().expect("ttl cache poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> TtlCacheInner<K, V> {
    fn evict_expired(&mut self) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
    }
}

/// Document store wrapper that memoizes fetches for a fixed lifetime.
///
/// Keeps caching at the store boundary so the aggregation functions stay pure.
pub struct CachedStore<S> {
    inner: S,
    collections: TtlCache<CollectionPath, Arc<Vec<RawDocument>>>,
    documents: TtlCache<(CollectionPath, DocumentId), Option<RawDocument>>,
}

impl<S: DocumentStore> CachedStore<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            collections: TtlCache::new(ttl),
            documents: TtlCache::new(ttl),
        }
    }

    /// Access the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Forget every cached fetch (the dashboard's manual refresh).
    pub fn clear(&self) {
        self.collections.clear();
        self.documents.clear();
        debug!("document cache cleared");
    }

    /// Combined hit/miss counters across collection and document fetches.
    pub fn stats(&self) -> CacheStats {
        let collections = self.collections.stats();
        let documents = self.documents.stats();
        CacheStats {
            hits: collections.hits + documents.hits,
            misses: collections.misses + documents.misses,
        }
    }
}

impl<S: DocumentStore> DocumentStore for CachedStore<S> {
    fn fetch_collection(&self, path: &str) -> Result<Vec<RawDocument>, PipelineError> {
        let documents = self
            .collections
            .get_or_try_insert_with(path.to_string(), || {
                debug!(collection = path, "collection cache miss");
                self.inner.fetch_collection(path).map(Arc::new)
            })?;
        Ok(documents.as_ref().clone())
    }

    fn fetch_document(&self, path: &str, id: &str) -> Result<Option<RawDocument>, PipelineError> {
        self.documents
            .get_or_try_insert_with((path.to_string(), id.to_string()), || {
                self.inner.fetch_document(path, id)
            })
    }
}

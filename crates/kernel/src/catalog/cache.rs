//! Per-collection lookup cache.
//!
//! Band metadata, quicklook bands and CRS are memoized by internal collection
//! id for the lifetime of the process. Entries are never evicted; the catalog
//! is treated as slow-changing within a deployment.

use std::future::Future;
use std::hash::Hash;

use dashmap::DashMap;

use crate::models::CollectionEo;

/// Concurrent get-or-compute map.
///
/// No lock is held while a value is computed, so concurrent first access to
/// the same key may compute it more than once. The last insert wins; values
/// are expected to be idempotent.
pub struct KeyedCache<K, V> {
    entries: DashMap<K, V>,
}

impl<K, V> Default for KeyedCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<K, V> KeyedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value for `key`, if computed.
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Return the cached value or compute, store and return it.
    ///
    /// Errors are returned without caching.
    pub async fn get_or_try_compute<F, Fut, E>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let value = compute().await?;
        self.entries.insert(key, value.clone());
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Auxiliary lookups shared by the enrichment pipelines.
#[derive(Default)]
pub struct LookupCache {
    /// Electro-optical band metadata by collection id.
    pub eo: KeyedCache<i64, CollectionEo>,
    /// Quicklook red/green/blue band names by collection id.
    pub quicklook: KeyedCache<i64, Option<Vec<String>>>,
    /// Resolved CRS by collection id.
    pub crs: KeyedCache<i64, Option<String>>,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn computes_once_then_hits() {
        let cache: KeyedCache<i64, String> = KeyedCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_try_compute(7, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, std::convert::Infallible>("EPSG:4326".to_string())
                })
                .await
                .unwrap();
            assert_eq!(value, "EPSG:4326");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache: KeyedCache<i64, u32> = KeyedCache::new();

        let err = cache
            .get_or_try_compute(1, || async { Err::<u32, _>("store unavailable") })
            .await;
        assert!(err.is_err());
        assert!(cache.is_empty());

        let ok = cache
            .get_or_try_compute(1, || async { Ok::<_, &str>(42) })
            .await
            .unwrap();
        assert_eq!(ok, 42);
    }

    #[tokio::test]
    async fn absent_values_are_cached_too() {
        let cache: KeyedCache<i64, Option<Vec<String>>> = KeyedCache::new();
        cache
            .get_or_try_compute(3, || async { Ok::<_, ()>(None) })
            .await
            .unwrap();
        assert_eq!(cache.get(&3), Some(None));
    }
}

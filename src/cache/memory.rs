//! In-process cache store with per-entry expiry and LRU eviction.
//!
//! Used when no Redis endpoint is configured and as the cache double in tests.
//! Expiry is measured on the tokio clock so paused-time tests can step past a TTL.

use std::num::NonZeroUsize;
use std::sync::{RwLock, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use tokio::time::Instant;
use tracing::warn;

use super::keys::CacheKey;
use super::store::{CacheStore, CacheUnavailable};

const SOURCE: &str = "cache::memory";

struct MemoryEntry {
    payload: Bytes,
    expires_at: Instant,
}

pub struct MemoryCacheStore {
    entries: RwLock<LruCache<String, MemoryEntry>>,
}

impl MemoryCacheStore {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// Number of stored entries, including ones that expired but were not read since.
    pub fn len(&self) -> usize {
        self.write("len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(&self, op: &'static str) -> RwLockWriteGuard<'_, LruCache<String, MemoryEntry>> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(
                    op,
                    target_module = SOURCE,
                    result = "poisoned_recovered",
                    "Recovered from poisoned cache lock"
                );
                poisoned.into_inner()
            }
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheUnavailable> {
        let mut entries = self.write("get");
        let now = Instant::now();
        match entries.get(key.as_str()) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.payload.clone())),
            Some(_) => {
                entries.pop(key.as_str());
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &CacheKey,
        payload: Bytes,
        ttl: Duration,
    ) -> Result<(), CacheUnavailable> {
        let entry = MemoryEntry {
            payload,
            expires_at: Instant::now() + ttl,
        };
        self.write("set").put(key.as_str().to_string(), entry);
        Ok(())
    }

    async fn delete_matching(&self, prefix: &str) -> Result<u64, CacheUnavailable> {
        let mut entries = self.write("delete_matching");
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        Ok(doomed.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;
    use crate::application::filter::normalize;
    use crate::cache::keys::{listing_search_key, listings_prefix};

    fn key(city: &str) -> CacheKey {
        listing_search_key(&normalize([("city", city)]).unwrap())
    }

    fn store(capacity: usize) -> MemoryCacheStore {
        MemoryCacheStore::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let store = store(8);
        let key = key("Lagos");
        store
            .set(&key, Bytes::from_static(b"page"), Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(
            store.get(&key).await.unwrap(),
            Some(Bytes::from_static(b"page"))
        );

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.get(&key).await.unwrap(), None);
        assert!(store.is_empty(), "expired entry should be evicted on read");
    }

    #[tokio::test]
    async fn set_overwrites_previous_payload() {
        let store = store(8);
        let key = key("Lagos");
        let ttl = Duration::from_secs(60);
        store.set(&key, Bytes::from_static(b"old"), ttl).await.unwrap();
        store.set(&key, Bytes::from_static(b"new"), ttl).await.unwrap();

        assert_eq!(store.get(&key).await.unwrap(), Some(Bytes::from_static(b"new")));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn delete_matching_removes_only_prefixed_keys() {
        let store = store(8);
        let ttl = Duration::from_secs(60);
        store.set(&key("Lagos"), Bytes::from_static(b"a"), ttl).await.unwrap();
        store.set(&key("Abuja"), Bytes::from_static(b"b"), ttl).await.unwrap();

        let removed = store.delete_matching(&listings_prefix()).await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.is_empty());

        assert_eq!(store.delete_matching(&listings_prefix()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_matching_leaves_other_namespaces() {
        let store = store(8);
        let ttl = Duration::from_secs(60);
        store.set(&key("Lagos"), Bytes::from_static(b"a"), ttl).await.unwrap();

        assert_eq!(store.delete_matching("favorites:").await.unwrap(), 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn least_recently_used_entry_is_evicted_at_capacity() {
        let store = store(2);
        let ttl = Duration::from_secs(60);
        let (a, b, c) = (key("A"), key("B"), key("C"));
        store.set(&a, Bytes::from_static(b"a"), ttl).await.unwrap();
        store.set(&b, Bytes::from_static(b"b"), ttl).await.unwrap();
        assert!(store.get(&a).await.unwrap().is_some());

        store.set(&c, Bytes::from_static(b"c"), ttl).await.unwrap();

        assert!(store.get(&a).await.unwrap().is_some());
        assert!(store.get(&b).await.unwrap().is_none());
        assert!(store.get(&c).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn store_recovers_from_poisoned_lock() {
        let store = store(2);
        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store.entries.write().expect("lock should be acquired");
            panic!("poison cache lock");
        }));

        let key = key("Lagos");
        store
            .set(&key, Bytes::from_static(b"a"), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(store.get(&key).await.unwrap().is_some());
    }
}

//! Cache-aside read path for listing search.
//!
//! A search normalizes its parameters, derives a cache key, and serves the
//! cached page when one is live. Otherwise it runs the query executor and
//! stores the fresh page for the configured TTL. Cache trouble of any kind
//! only costs latency: every cache call is time-boxed and its failure falls
//! through to the store.
//!
//! Writers call [`ListingSearchService::invalidate_listings`] once their
//! change is durable. The TTL bounds staleness when that call is lost.
//!
//! Each invalidation also advances an in-process generation. A miss whose
//! query overlapped an invalidation serves its page but does not cache it.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::filter::{FilterDescriptor, FilterError, normalize};
use crate::application::pagination::ResultPage;
use crate::application::query::ListingQueryExecutor;
use crate::application::repos::RepoError;
use crate::cache::{
    CacheConfig, CacheKey, CacheStore, CacheUnavailable, listing_search_key, listings_prefix,
};
use crate::domain::entities::ListingRecord;

const METRIC_CACHE_HIT: &str = "abode_cache_hit_total";
const METRIC_CACHE_MISS: &str = "abode_cache_miss_total";
const METRIC_CACHE_UNAVAILABLE: &str = "abode_cache_unavailable_total";
const METRIC_CACHE_INVALIDATION: &str = "abode_cache_invalidation_total";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from a live cache entry.
    Hit,
    /// Queried from the store because no usable entry existed.
    Miss,
    /// Queried from the store because caching is turned off.
    Bypass,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Bypass => "bypass",
        }
    }
}

/// A page ready to send, with the exact bytes that were (or would be) cached.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub page: ResultPage<ListingRecord>,
    pub payload: Bytes,
    pub status: CacheStatus,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Validation(#[from] FilterError),
    #[error(transparent)]
    Store(#[from] RepoError),
    #[error("failed to encode result page: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct ListingSearchService {
    executor: ListingQueryExecutor,
    cache: Arc<dyn CacheStore>,
    config: CacheConfig,
    generation: Arc<AtomicU64>,
}

impl ListingSearchService {
    pub fn new(
        executor: ListingQueryExecutor,
        cache: Arc<dyn CacheStore>,
        config: CacheConfig,
    ) -> Self {
        Self {
            executor,
            cache,
            config,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Search with raw query-string pairs.
    pub async fn search<'a, I>(&self, params: I) -> Result<SearchOutcome, SearchError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let filter = normalize(params)?;
        self.search_normalized(&filter).await
    }

    pub async fn search_normalized(
        &self,
        filter: &FilterDescriptor,
    ) -> Result<SearchOutcome, SearchError> {
        if !self.config.enabled {
            let page = self.executor.execute(filter).await?;
            let payload = Bytes::from(serde_json::to_vec(&page)?);
            return Ok(SearchOutcome {
                page,
                payload,
                status: CacheStatus::Bypass,
            });
        }

        let key = listing_search_key(filter);
        let generation = self.generation.load(Ordering::Acquire);

        if let Some(outcome) = self.lookup(&key).await {
            counter!(METRIC_CACHE_HIT).increment(1);
            return Ok(outcome);
        }
        counter!(METRIC_CACHE_MISS).increment(1);

        let page = self.executor.execute(filter).await?;
        let payload = Bytes::from(serde_json::to_vec(&page)?);
        if self.generation.load(Ordering::Acquire) == generation {
            self.populate(&key, payload.clone()).await;
        } else {
            debug!(key = %key, "Listings changed during query; page not cached");
        }

        Ok(SearchOutcome {
            page,
            payload,
            status: CacheStatus::Miss,
        })
    }

    /// Drop every cached listing search. Returns the number of removed
    /// entries, or `None` when caching is off or the cache could not be reached.
    pub async fn invalidate_listings(&self) -> Option<u64> {
        if !self.config.enabled {
            return None;
        }
        self.generation.fetch_add(1, Ordering::AcqRel);

        let prefix = listings_prefix();
        match self
            .guarded(self.cache.delete_matching(&prefix), "delete_matching")
            .await
        {
            Ok(removed) => {
                counter!(METRIC_CACHE_INVALIDATION, "result" => "ok").increment(1);
                debug!(prefix = %prefix, removed, "Listing search cache invalidated");
                Some(removed)
            }
            Err(err) => {
                counter!(METRIC_CACHE_INVALIDATION, "result" => "unavailable").increment(1);
                warn!(
                    prefix = %prefix,
                    error = %err,
                    "Cache invalidation failed; entries expire after their TTL"
                );
                None
            }
        }
    }

    async fn lookup(&self, key: &CacheKey) -> Option<SearchOutcome> {
        let payload = match self.guarded(self.cache.get(key), "get").await {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(err) => {
                warn!(key = %key, error = %err, "Cache read failed; querying store");
                return None;
            }
        };

        match serde_json::from_slice::<ResultPage<ListingRecord>>(&payload) {
            Ok(page) => Some(SearchOutcome {
                page,
                payload,
                status: CacheStatus::Hit,
            }),
            Err(err) => {
                warn!(key = %key, error = %err, "Discarding undecodable cache entry");
                None
            }
        }
    }

    async fn populate(&self, key: &CacheKey, payload: Bytes) {
        let ttl = self.config.ttl;
        if let Err(err) = self.guarded(self.cache.set(key, payload, ttl), "set").await {
            warn!(key = %key, error = %err, "Cache write failed; page served uncached");
        }
    }

    async fn guarded<T, F>(&self, operation: F, op: &'static str) -> Result<T, CacheUnavailable>
    where
        F: Future<Output = Result<T, CacheUnavailable>>,
    {
        let timeout = self.config.operation_timeout;
        let result = match tokio::time::timeout(timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(CacheUnavailable::Timeout {
                op,
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        };
        if let Err(err) = &result {
            counter!(METRIC_CACHE_UNAVAILABLE, "op" => err.op()).increment(1);
        }
        result
    }
}

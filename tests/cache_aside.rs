use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use abode::application::listings::ListingService;
use abode::application::query::ListingQueryExecutor;
use abode::application::search::{CacheStatus, ListingSearchService};
use abode::cache::{CacheConfig, CacheKey, CacheStore, CacheUnavailable, MemoryCacheStore};
use abode::domain::entities::{ListingAttributes, UserSummary};
use abode::infra::memory::MemoryStore;
use async_trait::async_trait;
use bytes::Bytes;
use time::macros::datetime;
use uuid::Uuid;

/// Memory cache that can be switched off to simulate an outage.
struct SwitchableCache {
    inner: MemoryCacheStore,
    up: AtomicBool,
}

impl SwitchableCache {
    fn new() -> Self {
        Self {
            inner: MemoryCacheStore::new(NonZeroUsize::new(64).unwrap()),
            up: AtomicBool::new(true),
        }
    }

    fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }

    fn check(&self, op: &'static str) -> Result<(), CacheUnavailable> {
        if self.up.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheUnavailable::transport(op, "connection refused"))
        }
    }
}

#[async_trait]
impl CacheStore for SwitchableCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheUnavailable> {
        self.check("get")?;
        self.inner.get(key).await
    }

    async fn set(
        &self,
        key: &CacheKey,
        payload: Bytes,
        ttl: Duration,
    ) -> Result<(), CacheUnavailable> {
        self.check("set")?;
        self.inner.set(key, payload, ttl).await
    }

    async fn delete_matching(&self, prefix: &str) -> Result<u64, CacheUnavailable> {
        self.check("delete_matching")?;
        self.inner.delete_matching(prefix).await
    }
}

fn attributes(city: &str, price: f64) -> ListingAttributes {
    ListingAttributes {
        title: format!("House in {city}"),
        kind: "Duplex".to_string(),
        price,
        state: "Lagos".to_string(),
        city: city.to_string(),
        area_sq_ft: 2_400.0,
        bedrooms: 4,
        bathrooms: 3,
        amenities: Vec::new(),
        furnished: false,
        available_from: datetime!(2025-06-01 00:00 UTC),
        listed_by: "Builder".to_string(),
        tags: vec!["garden".to_string()],
        color_theme: String::new(),
        rating: 3.5,
        is_verified: false,
        listing_type: "sale".to_string(),
    }
}

struct Fixture {
    store: Arc<MemoryStore>,
    cache: Arc<SwitchableCache>,
    search: ListingSearchService,
    listings: ListingService,
    owner: Uuid,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let owner = store
        .add_user(UserSummary {
            id: Uuid::new_v4(),
            name: "Owner".to_string(),
            email: "owner@example.com".to_string(),
        })
        .unwrap()
        .id;
    let cache = Arc::new(SwitchableCache::new());
    let executor = ListingQueryExecutor::new(store.clone(), Duration::from_secs(5));
    let search = ListingSearchService::new(executor, cache.clone(), CacheConfig::default());
    let listings = ListingService::new(
        store.clone(),
        store.clone(),
        search.clone(),
        Duration::from_secs(5),
    );
    Fixture {
        store,
        cache,
        search,
        listings,
        owner,
    }
}

const LEKKI: [(&str, &str); 2] = [("city", "Lekki"), ("pageSize", "5")];

#[tokio::test]
async fn outage_degrades_to_store_reads_and_recovers() {
    let fx = fixture();
    fx.store.seed_listing(fx.owner, attributes("Lekki", 50_000.0));

    fx.cache.set_up(false);
    for _ in 0..2 {
        let outcome = fx.search.search(LEKKI).await.unwrap();
        assert_eq!(outcome.status, CacheStatus::Miss);
        assert_eq!(outcome.page.total_count, 1);
    }
    assert_eq!(fx.store.search_calls(), 2);

    fx.cache.set_up(true);
    let refill = fx.search.search(LEKKI).await.unwrap();
    assert_eq!(refill.status, CacheStatus::Miss);
    let hit = fx.search.search(LEKKI).await.unwrap();
    assert_eq!(hit.status, CacheStatus::Hit);
    assert_eq!(hit.payload, refill.payload);
    assert_eq!(fx.store.search_calls(), 3);
}

#[tokio::test]
async fn writes_through_the_listing_service_invalidate_cached_searches() {
    let fx = fixture();
    let existing = fx.store.seed_listing(fx.owner, attributes("Lekki", 50_000.0));

    let warm = fx.search.search(LEKKI).await.unwrap();
    assert_eq!(warm.page.total_count, 1);
    assert_eq!(
        fx.search.search(LEKKI).await.unwrap().status,
        CacheStatus::Hit
    );

    fx.listings
        .create(fx.owner, attributes("Lekki", 75_000.0))
        .await
        .unwrap();
    let after_create = fx.search.search(LEKKI).await.unwrap();
    assert_eq!(after_create.status, CacheStatus::Miss);
    assert_eq!(after_create.page.total_count, 2);

    let mut moved = attributes("Ajah", 50_000.0);
    moved.title = "Relisted".to_string();
    fx.listings.update(fx.owner, existing.id, moved).await.unwrap();
    let after_update = fx.search.search(LEKKI).await.unwrap();
    assert_eq!(after_update.status, CacheStatus::Miss);
    assert_eq!(after_update.page.total_count, 1);

    fx.listings.delete(fx.owner, existing.id).await.unwrap();
    let ajah = fx.search.search([("city", "Ajah")]).await.unwrap();
    assert_eq!(ajah.page.total_count, 0);
}

#[tokio::test]
async fn write_during_outage_still_succeeds() {
    let fx = fixture();
    fx.store.seed_listing(fx.owner, attributes("Lekki", 50_000.0));
    fx.search.search(LEKKI).await.unwrap();

    fx.cache.set_up(false);
    let created = fx
        .listings
        .create(fx.owner, attributes("Lekki", 60_000.0))
        .await;
    assert!(created.is_ok());
    assert_eq!(fx.search.invalidate_listings().await, None);
}

#[tokio::test]
async fn pages_partition_the_match_set() {
    let fx = fixture();
    for step in 0..7 {
        fx.store
            .seed_listing(fx.owner, attributes("Lekki", 10_000.0 + f64::from(step)));
    }

    let mut seen = Vec::new();
    for page in ["1", "2", "3"] {
        let outcome = fx
            .search
            .search([("city", "Lekki"), ("pageSize", "3"), ("page", page)])
            .await
            .unwrap();
        assert_eq!(outcome.page.total_count, 7);
        assert_eq!(outcome.page.total_pages, 3);
        seen.extend(outcome.page.items.into_iter().map(|item| item.id));
    }
    let beyond = fx
        .search
        .search([("city", "Lekki"), ("pageSize", "3"), ("page", "4")])
        .await
        .unwrap();
    assert!(beyond.page.items.is_empty());
    assert_eq!(beyond.page.total_count, 7);

    let unique: std::collections::HashSet<_> = seen.iter().collect();
    assert_eq!(seen.len(), 7);
    assert_eq!(unique.len(), 7);
}

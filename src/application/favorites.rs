//! Favorites with a one-link-per-pair guarantee.
//!
//! The existence check gives callers a clean conflict error in the common
//! case. Two racing requests can both pass it, so the store's unique index on
//! `(user_id, listing_id)` decides; its violation maps to the same error.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{FavoritesRepo, ListingsRepo, RepoError, bounded};
use crate::domain::entities::{FavoriteRecord, FavoriteWithListing};

#[derive(Debug, Error)]
pub enum FavoriteError {
    #[error("listing not found")]
    ListingNotFound,
    #[error("listing is already in favorites")]
    DuplicateLink,
    #[error("favorite not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FavoriteService {
    listings: Arc<dyn ListingsRepo>,
    favorites: Arc<dyn FavoritesRepo>,
    timeout: Duration,
}

impl FavoriteService {
    /// Every store call is bounded by `timeout`.
    pub fn new(
        listings: Arc<dyn ListingsRepo>,
        favorites: Arc<dyn FavoritesRepo>,
        timeout: Duration,
    ) -> Self {
        Self {
            listings,
            favorites,
            timeout,
        }
    }

    pub async fn add(&self, user_id: Uuid, listing_id: Uuid) -> Result<FavoriteRecord, FavoriteError> {
        self.ensure_listing(listing_id).await?;

        let existing = bounded(
            self.timeout,
            self.favorites.find_favorite(user_id, listing_id),
        )
        .await?;
        if existing.is_some() {
            return Err(FavoriteError::DuplicateLink);
        }

        let favorite = bounded(
            self.timeout,
            self.favorites.insert_favorite(user_id, listing_id),
        )
        .await
        .map_err(|err| match err {
            RepoError::Duplicate { .. } => FavoriteError::DuplicateLink,
            other => FavoriteError::Repo(other),
        })?;

        info!(user_id = %user_id, listing_id = %listing_id, "Favorite added");
        Ok(favorite)
    }

    pub async fn remove(&self, user_id: Uuid, listing_id: Uuid) -> Result<(), FavoriteError> {
        self.ensure_listing(listing_id).await?;

        bounded(
            self.timeout,
            self.favorites.delete_favorite(user_id, listing_id),
        )
        .await
        .map_err(|err| match err {
            RepoError::NotFound => FavoriteError::NotFound,
            other => FavoriteError::Repo(other),
        })?;

        info!(user_id = %user_id, listing_id = %listing_id, "Favorite removed");
        Ok(())
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<FavoriteWithListing>, FavoriteError> {
        Ok(bounded(self.timeout, self.favorites.list_for_user(user_id)).await?)
    }

    async fn ensure_listing(&self, listing_id: Uuid) -> Result<(), FavoriteError> {
        match bounded(self.timeout, self.listings.find_by_id(listing_id)).await? {
            Some(_) => Ok(()),
            None => Err(FavoriteError::ListingNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::domain::entities::fixtures;
    use crate::infra::memory::MemoryStore;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn setup() -> (Arc<MemoryStore>, FavoriteService, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let listing = store.seed_listing(Uuid::new_v4(), fixtures::attributes("Lagos", 1_000.0));
        let service = FavoriteService::new(store.clone(), store.clone(), TIMEOUT);
        (store, service, listing.id)
    }

    #[tokio::test]
    async fn second_favorite_for_same_pair_is_a_conflict() {
        let (_store, service, listing_id) = setup();
        let user = Uuid::new_v4();

        service.add(user, listing_id).await.unwrap();
        let err = service.add(user, listing_id).await.unwrap_err();

        assert!(matches!(err, FavoriteError::DuplicateLink));
        assert_eq!(service.list(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn different_users_may_favorite_the_same_listing() {
        let (_store, service, listing_id) = setup();

        service.add(Uuid::new_v4(), listing_id).await.unwrap();
        service.add(Uuid::new_v4(), listing_id).await.unwrap();
    }

    #[tokio::test]
    async fn removing_a_missing_favorite_is_not_found() {
        let (_store, service, listing_id) = setup();
        let user = Uuid::new_v4();

        let err = service.remove(user, listing_id).await.unwrap_err();
        assert!(matches!(err, FavoriteError::NotFound));

        service.add(user, listing_id).await.unwrap();
        service.remove(user, listing_id).await.unwrap();
        assert!(service.list(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_listing_is_rejected() {
        let (_store, service, _listing_id) = setup();

        let err = service.add(Uuid::new_v4(), Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, FavoriteError::ListingNotFound));
    }

    /// Favorites repo whose existence check always misses, as if every
    /// request raced another one past the check.
    struct BlindFavorites(Arc<MemoryStore>);

    #[async_trait]
    impl FavoritesRepo for BlindFavorites {
        async fn find_favorite(
            &self,
            _user_id: Uuid,
            _listing_id: Uuid,
        ) -> Result<Option<FavoriteRecord>, RepoError> {
            tokio::task::yield_now().await;
            Ok(None)
        }

        async fn insert_favorite(
            &self,
            user_id: Uuid,
            listing_id: Uuid,
        ) -> Result<FavoriteRecord, RepoError> {
            self.0.insert_favorite(user_id, listing_id).await
        }

        async fn delete_favorite(&self, user_id: Uuid, listing_id: Uuid) -> Result<(), RepoError> {
            self.0.delete_favorite(user_id, listing_id).await
        }

        async fn list_for_user(
            &self,
            user_id: Uuid,
        ) -> Result<Vec<FavoriteWithListing>, RepoError> {
            self.0.list_for_user(user_id).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn store_constraint_rejects_concurrent_duplicate() {
        let (store, _service, listing_id) = setup();
        let service = FavoriteService::new(
            store.clone(),
            Arc::new(BlindFavorites(store.clone())),
            TIMEOUT,
        );
        let user = Uuid::new_v4();

        let left = tokio::spawn({
            let service = service.clone();
            async move { service.add(user, listing_id).await }
        });
        let right = tokio::spawn({
            let service = service.clone();
            async move { service.add(user, listing_id).await }
        });
        let outcomes = [left.await.unwrap(), right.await.unwrap()];

        let created = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
        let conflicts = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, Err(FavoriteError::DuplicateLink)))
            .count();
        assert_eq!((created, conflicts), (1, 1));
        assert_eq!(store.list_for_user(user).await.unwrap().len(), 1);
    }

    /// Favorites repo that never answers.
    struct StalledFavorites;

    #[async_trait]
    impl FavoritesRepo for StalledFavorites {
        async fn find_favorite(
            &self,
            _user_id: Uuid,
            _listing_id: Uuid,
        ) -> Result<Option<FavoriteRecord>, RepoError> {
            std::future::pending().await
        }

        async fn insert_favorite(
            &self,
            _user_id: Uuid,
            _listing_id: Uuid,
        ) -> Result<FavoriteRecord, RepoError> {
            std::future::pending().await
        }

        async fn delete_favorite(&self, _user_id: Uuid, _listing_id: Uuid) -> Result<(), RepoError> {
            std::future::pending().await
        }

        async fn list_for_user(
            &self,
            _user_id: Uuid,
        ) -> Result<Vec<FavoriteWithListing>, RepoError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_store_surfaces_timeout() {
        let (store, _service, listing_id) = setup();
        let service = FavoriteService::new(
            store,
            Arc::new(StalledFavorites),
            Duration::from_millis(250),
        );
        let user = Uuid::new_v4();

        let add = service.add(user, listing_id).await.unwrap_err();
        assert!(matches!(add, FavoriteError::Repo(RepoError::Timeout)));

        let remove = service.remove(user, listing_id).await.unwrap_err();
        assert!(matches!(remove, FavoriteError::Repo(RepoError::Timeout)));

        let list = service.list(user).await.unwrap_err();
        assert!(matches!(list, FavoriteError::Repo(RepoError::Timeout)));
    }
}

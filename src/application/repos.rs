//! Repository traits describing persistence adapters.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::application::filter::FilterDescriptor;
use crate::application::pagination::PageWindow;
use crate::domain::entities::{
    FavoriteRecord, FavoriteWithListing, ListingAttributes, ListingRecord, ReceivedRecommendation,
    RecommendationRecord, UserSummary,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Await a store call for at most `timeout`, reporting [`RepoError::Timeout`]
/// once it elapses.
pub async fn bounded<T, F>(timeout: Duration, operation: F) -> Result<T, RepoError>
where
    F: Future<Output = Result<T, RepoError>>,
{
    tokio::time::timeout(timeout, operation)
        .await
        .map_err(|_| RepoError::Timeout)?
}

#[derive(Debug, Clone)]
pub struct CreateListingParams {
    pub created_by: Uuid,
    pub attributes: ListingAttributes,
}

#[derive(Debug, Clone)]
pub struct UpdateListingParams {
    pub id: Uuid,
    pub attributes: ListingAttributes,
}

#[derive(Debug, Clone)]
pub struct CreateRecommendationParams {
    pub from_user: Uuid,
    pub to_user: Uuid,
    pub listing_id: Uuid,
    pub message: String,
}

/// Read side of the listing store.
///
/// `search_listings` and `count_listings` must apply the same predicate set,
/// and `search_listings` must return rows newest first with a total order.
#[async_trait]
pub trait ListingsRepo: Send + Sync {
    async fn search_listings(
        &self,
        filter: &FilterDescriptor,
        window: PageWindow,
    ) -> Result<Vec<ListingRecord>, RepoError>;

    async fn count_listings(&self, filter: &FilterDescriptor) -> Result<u64, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ListingRecord>, RepoError>;
}

#[async_trait]
pub trait ListingsWriteRepo: Send + Sync {
    async fn create_listing(&self, params: CreateListingParams)
    -> Result<ListingRecord, RepoError>;

    /// Fails with [`RepoError::NotFound`] when no listing has the given id.
    async fn update_listing(&self, params: UpdateListingParams)
    -> Result<ListingRecord, RepoError>;

    /// Fails with [`RepoError::NotFound`] when no listing has the given id.
    async fn delete_listing(&self, id: Uuid) -> Result<(), RepoError>;
}

/// Favorites keyed by `(user_id, listing_id)`.
///
/// Implementations must enforce uniqueness of that pair at the store level and
/// report a violation as [`RepoError::Duplicate`].
#[async_trait]
pub trait FavoritesRepo: Send + Sync {
    async fn find_favorite(
        &self,
        user_id: Uuid,
        listing_id: Uuid,
    ) -> Result<Option<FavoriteRecord>, RepoError>;

    async fn insert_favorite(
        &self,
        user_id: Uuid,
        listing_id: Uuid,
    ) -> Result<FavoriteRecord, RepoError>;

    /// Removes the single matching favorite, or fails with [`RepoError::NotFound`].
    async fn delete_favorite(&self, user_id: Uuid, listing_id: Uuid) -> Result<(), RepoError>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<FavoriteWithListing>, RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserSummary>, RepoError>;
}

#[async_trait]
pub trait RecommendationsRepo: Send + Sync {
    async fn create_recommendation(
        &self,
        params: CreateRecommendationParams,
    ) -> Result<RecommendationRecord, RepoError>;

    /// Recommendations addressed to `user_id`, newest first.
    async fn list_received(&self, user_id: Uuid)
    -> Result<Vec<ReceivedRecommendation>, RepoError>;
}

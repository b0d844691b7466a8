//! Listing mutations and lookups.
//!
//! Every successful write is followed by a search-cache invalidation. The
//! invalidation runs only after the store acknowledged the write, so a page
//! cached from pre-write data cannot outlive the write unnoticed.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{
    CreateListingParams, ListingsRepo, ListingsWriteRepo, RepoError, UpdateListingParams, bounded,
};
use crate::application::search::ListingSearchService;
use crate::domain::entities::{ListingAttributes, ListingRecord};
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("listing not found")]
    NotFound,
    #[error("listing belongs to another user")]
    Forbidden,
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for ListingError {
    fn from(error: RepoError) -> Self {
        match error {
            RepoError::NotFound => ListingError::NotFound,
            other => ListingError::Repo(other),
        }
    }
}

#[derive(Clone)]
pub struct ListingService {
    reader: Arc<dyn ListingsRepo>,
    writer: Arc<dyn ListingsWriteRepo>,
    search: ListingSearchService,
    timeout: Duration,
}

impl ListingService {
    /// Every store call is bounded by `timeout`.
    pub fn new(
        reader: Arc<dyn ListingsRepo>,
        writer: Arc<dyn ListingsWriteRepo>,
        search: ListingSearchService,
        timeout: Duration,
    ) -> Self {
        Self {
            reader,
            writer,
            search,
            timeout,
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<ListingRecord, ListingError> {
        bounded(self.timeout, self.reader.find_by_id(id))
            .await?
            .ok_or(ListingError::NotFound)
    }

    pub async fn create(
        &self,
        actor: Uuid,
        attributes: ListingAttributes,
    ) -> Result<ListingRecord, ListingError> {
        attributes.validate()?;
        let listing = bounded(
            self.timeout,
            self.writer.create_listing(CreateListingParams {
                created_by: actor,
                attributes,
            }),
        )
        .await?;

        self.search.invalidate_listings().await;
        info!(listing_id = %listing.id, actor = %actor, "Listing created");
        Ok(listing)
    }

    pub async fn update(
        &self,
        actor: Uuid,
        id: Uuid,
        attributes: ListingAttributes,
    ) -> Result<ListingRecord, ListingError> {
        attributes.validate()?;
        self.owned_by(actor, id).await?;

        let listing = bounded(
            self.timeout,
            self.writer
                .update_listing(UpdateListingParams { id, attributes }),
        )
        .await?;

        self.search.invalidate_listings().await;
        info!(listing_id = %id, actor = %actor, "Listing updated");
        Ok(listing)
    }

    pub async fn delete(&self, actor: Uuid, id: Uuid) -> Result<(), ListingError> {
        self.owned_by(actor, id).await?;
        bounded(self.timeout, self.writer.delete_listing(id)).await?;

        self.search.invalidate_listings().await;
        info!(listing_id = %id, actor = %actor, "Listing deleted");
        Ok(())
    }

    async fn owned_by(&self, actor: Uuid, id: Uuid) -> Result<ListingRecord, ListingError> {
        let listing = self.get(id).await?;
        if listing.created_by != actor {
            return Err(ListingError::Forbidden);
        }
        Ok(listing)
    }
}

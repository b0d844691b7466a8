//! Process-local store implementing every repository trait.
//!
//! Backs the server when no database URL is configured and doubles as the
//! store in tests. All state sits behind one mutex, so the favorites
//! uniqueness check and insert are atomic here the same way the Postgres
//! unique index makes them atomic there.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::filter::{Constraint, FilterDescriptor, FilterField, FilterValue};
use crate::application::pagination::PageWindow;
use crate::application::repos::{
    CreateListingParams, CreateRecommendationParams, FavoritesRepo, ListingsRepo,
    ListingsWriteRepo, RecommendationsRepo, RepoError, UpdateListingParams, UsersRepo,
};
use crate::domain::entities::{
    FavoriteRecord, FavoriteWithListing, ListingAttributes, ListingRecord, ReceivedRecommendation,
    RecommendationRecord, UserSummary,
};

const FAVORITES_UNIQUE: &str = "favorites_user_id_listing_id_key";
const USERS_EMAIL_UNIQUE: &str = "users_email_key";

#[derive(Default)]
struct MemoryState {
    users: Vec<UserSummary>,
    listings: Vec<ListingRecord>,
    favorites: Vec<FavoriteRecord>,
    recommendations: Vec<RecommendationRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    search_calls: AtomicUsize,
    count_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user, failing when the email is already taken.
    pub fn add_user(&self, user: UserSummary) -> Result<UserSummary, RepoError> {
        let mut state = self.state();
        if state
            .users
            .iter()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(RepoError::Duplicate {
                constraint: USERS_EMAIL_UNIQUE.to_string(),
            });
        }
        if let Some(existing) = state.users.iter().find(|existing| existing.id == user.id) {
            return Ok(existing.clone());
        }
        state.users.push(user.clone());
        Ok(user)
    }

    /// Insert a listing without going through the write path.
    pub fn seed_listing(&self, created_by: Uuid, attributes: ListingAttributes) -> ListingRecord {
        let record = build_listing(Uuid::new_v4(), created_by, attributes, OffsetDateTime::now_utc());
        self.state().listings.push(record.clone());
        record
    }

    /// Number of page queries served so far.
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(AtomicOrdering::SeqCst)
    }

    /// Number of count queries served so far.
    pub fn count_calls(&self) -> usize {
        self.count_calls.load(AtomicOrdering::SeqCst)
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn build_listing(
    id: Uuid,
    created_by: Uuid,
    attributes: ListingAttributes,
    created_at: OffsetDateTime,
) -> ListingRecord {
    let ListingAttributes {
        title,
        kind,
        price,
        state,
        city,
        area_sq_ft,
        bedrooms,
        bathrooms,
        amenities,
        furnished,
        available_from,
        listed_by,
        tags,
        color_theme,
        rating,
        is_verified,
        listing_type,
    } = attributes;

    ListingRecord {
        id,
        title,
        kind,
        price,
        state,
        city,
        area_sq_ft,
        bedrooms,
        bathrooms,
        amenities,
        furnished,
        available_from,
        listed_by,
        tags,
        color_theme,
        rating,
        is_verified,
        listing_type,
        created_by,
        created_at,
        updated_at: created_at,
    }
}

fn matches(filter: &FilterDescriptor, listing: &ListingRecord) -> bool {
    filter
        .constraints()
        .iter()
        .all(|(field, constraint)| satisfies(*field, constraint, listing))
}

fn satisfies(field: FilterField, constraint: &Constraint, listing: &ListingRecord) -> bool {
    match constraint {
        Constraint::Eq { value } => match (field, value) {
            (FilterField::Type, FilterValue::Text(text)) => listing.kind == *text,
            (FilterField::State, FilterValue::Text(text)) => listing.state == *text,
            (FilterField::City, FilterValue::Text(text)) => listing.city == *text,
            (FilterField::ListingType, FilterValue::Text(text)) => listing.listing_type == *text,
            (FilterField::Bedrooms, FilterValue::Integer(count)) => {
                i64::from(listing.bedrooms) == *count
            }
            (FilterField::Bathrooms, FilterValue::Integer(count)) => {
                i64::from(listing.bathrooms) == *count
            }
            (FilterField::Furnished, FilterValue::Flag(flag)) => listing.furnished == *flag,
            (FilterField::IsVerified, FilterValue::Flag(flag)) => listing.is_verified == *flag,
            _ => false,
        },
        Constraint::Range { min, max } => {
            let value = match field {
                FilterField::Price => listing.price,
                FilterField::AreaSqFt => listing.area_sq_ft,
                _ => return false,
            };
            min.is_none_or(|min| value >= min) && max.is_none_or(|max| value <= max)
        }
        Constraint::AnyOf { values } => match field {
            FilterField::Tags => listing.tags.iter().any(|tag| values.contains(tag)),
            _ => false,
        },
    }
}

fn newest_first(left: &ListingRecord, right: &ListingRecord) -> Ordering {
    right
        .created_at
        .cmp(&left.created_at)
        .then_with(|| right.id.cmp(&left.id))
}

#[async_trait]
impl ListingsRepo for MemoryStore {
    async fn search_listings(
        &self,
        filter: &FilterDescriptor,
        window: PageWindow,
    ) -> Result<Vec<ListingRecord>, RepoError> {
        self.search_calls.fetch_add(1, AtomicOrdering::SeqCst);
        let state = self.state();
        let mut matched: Vec<&ListingRecord> = state
            .listings
            .iter()
            .filter(|listing| matches(filter, listing))
            .collect();
        matched.sort_by(|left, right| newest_first(left, right));

        let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
        Ok(matched
            .into_iter()
            .skip(offset)
            .take(window.limit as usize)
            .cloned()
            .collect())
    }

    async fn count_listings(&self, filter: &FilterDescriptor) -> Result<u64, RepoError> {
        self.count_calls.fetch_add(1, AtomicOrdering::SeqCst);
        let state = self.state();
        let count = state
            .listings
            .iter()
            .filter(|listing| matches(filter, listing))
            .count();
        Ok(count as u64)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ListingRecord>, RepoError> {
        Ok(self
            .state()
            .listings
            .iter()
            .find(|listing| listing.id == id)
            .cloned())
    }
}

#[async_trait]
impl ListingsWriteRepo for MemoryStore {
    async fn create_listing(
        &self,
        params: CreateListingParams,
    ) -> Result<ListingRecord, RepoError> {
        let record = build_listing(
            Uuid::new_v4(),
            params.created_by,
            params.attributes,
            OffsetDateTime::now_utc(),
        );
        self.state().listings.push(record.clone());
        Ok(record)
    }

    async fn update_listing(
        &self,
        params: UpdateListingParams,
    ) -> Result<ListingRecord, RepoError> {
        let mut state = self.state();
        let slot = state
            .listings
            .iter_mut()
            .find(|listing| listing.id == params.id)
            .ok_or(RepoError::NotFound)?;

        let mut updated = build_listing(slot.id, slot.created_by, params.attributes, slot.created_at);
        updated.updated_at = OffsetDateTime::now_utc();
        *slot = updated.clone();
        Ok(updated)
    }

    async fn delete_listing(&self, id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state();
        let before = state.listings.len();
        state.listings.retain(|listing| listing.id != id);
        if state.listings.len() == before {
            return Err(RepoError::NotFound);
        }
        state.favorites.retain(|favorite| favorite.listing_id != id);
        state
            .recommendations
            .retain(|recommendation| recommendation.listing_id != id);
        Ok(())
    }
}

#[async_trait]
impl FavoritesRepo for MemoryStore {
    async fn find_favorite(
        &self,
        user_id: Uuid,
        listing_id: Uuid,
    ) -> Result<Option<FavoriteRecord>, RepoError> {
        Ok(self
            .state()
            .favorites
            .iter()
            .find(|favorite| favorite.user_id == user_id && favorite.listing_id == listing_id)
            .cloned())
    }

    async fn insert_favorite(
        &self,
        user_id: Uuid,
        listing_id: Uuid,
    ) -> Result<FavoriteRecord, RepoError> {
        let mut state = self.state();
        if !state.listings.iter().any(|listing| listing.id == listing_id) {
            return Err(RepoError::Integrity {
                message: format!("listing `{listing_id}` does not exist"),
            });
        }
        if state
            .favorites
            .iter()
            .any(|favorite| favorite.user_id == user_id && favorite.listing_id == listing_id)
        {
            return Err(RepoError::Duplicate {
                constraint: FAVORITES_UNIQUE.to_string(),
            });
        }

        let record = FavoriteRecord {
            id: Uuid::new_v4(),
            user_id,
            listing_id,
            created_at: OffsetDateTime::now_utc(),
        };
        state.favorites.push(record.clone());
        Ok(record)
    }

    async fn delete_favorite(&self, user_id: Uuid, listing_id: Uuid) -> Result<(), RepoError> {
        let mut state = self.state();
        let position = state
            .favorites
            .iter()
            .position(|favorite| favorite.user_id == user_id && favorite.listing_id == listing_id)
            .ok_or(RepoError::NotFound)?;
        state.favorites.remove(position);
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<FavoriteWithListing>, RepoError> {
        let state = self.state();
        let mut favorites: Vec<FavoriteWithListing> = state
            .favorites
            .iter()
            .filter(|favorite| favorite.user_id == user_id)
            .filter_map(|favorite| {
                let listing = state
                    .listings
                    .iter()
                    .find(|listing| listing.id == favorite.listing_id)?;
                Some(FavoriteWithListing {
                    id: favorite.id,
                    user_id: favorite.user_id,
                    listing: listing.clone(),
                    created_at: favorite.created_at,
                })
            })
            .collect();
        favorites.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(favorites)
    }
}

#[async_trait]
impl UsersRepo for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserSummary>, RepoError> {
        Ok(self
            .state()
            .users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }
}

#[async_trait]
impl RecommendationsRepo for MemoryStore {
    async fn create_recommendation(
        &self,
        params: CreateRecommendationParams,
    ) -> Result<RecommendationRecord, RepoError> {
        let mut state = self.state();
        if !state.listings.iter().any(|listing| listing.id == params.listing_id) {
            return Err(RepoError::Integrity {
                message: format!("listing `{}` does not exist", params.listing_id),
            });
        }

        let record = RecommendationRecord {
            id: Uuid::new_v4(),
            from_user: params.from_user,
            to_user: params.to_user,
            listing_id: params.listing_id,
            message: params.message,
            is_read: false,
            created_at: OffsetDateTime::now_utc(),
        };
        state.recommendations.push(record.clone());
        Ok(record)
    }

    async fn list_received(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ReceivedRecommendation>, RepoError> {
        let state = self.state();
        let mut received: Vec<ReceivedRecommendation> = state
            .recommendations
            .iter()
            .filter(|recommendation| recommendation.to_user == user_id)
            .filter_map(|recommendation| {
                let listing = state
                    .listings
                    .iter()
                    .find(|listing| listing.id == recommendation.listing_id)?;
                let from = state
                    .users
                    .iter()
                    .find(|user| user.id == recommendation.from_user)
                    .cloned()
                    .unwrap_or_else(|| UserSummary {
                        id: recommendation.from_user,
                        name: String::new(),
                        email: String::new(),
                    });
                Some(ReceivedRecommendation {
                    id: recommendation.id,
                    from,
                    listing: listing.clone(),
                    message: recommendation.message.clone(),
                    is_read: recommendation.is_read,
                    created_at: recommendation.created_at,
                })
            })
            .collect();
        received.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(received)
    }
}

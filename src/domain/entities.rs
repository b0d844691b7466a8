//! Domain entities mirrored from persistent storage.
//!
//! Every record serializes with camelCase field names; cached result pages
//! embed `ListingRecord` verbatim, so the serde shape is also the cache payload.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::error::DomainError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub price: f64,
    pub state: String,
    pub city: String,
    pub area_sq_ft: f64,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub amenities: Vec<String>,
    pub furnished: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub available_from: OffsetDateTime,
    pub listed_by: String,
    pub tags: Vec<String>,
    pub color_theme: String,
    pub rating: f64,
    pub is_verified: bool,
    pub listing_type: String,
    pub created_by: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Mutable attributes of a listing, supplied on create and full update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingAttributes {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub price: f64,
    pub state: String,
    pub city: String,
    pub area_sq_ft: f64,
    pub bedrooms: i32,
    pub bathrooms: i32,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub furnished: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub available_from: OffsetDateTime,
    pub listed_by: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub color_theme: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub is_verified: bool,
    pub listing_type: String,
}

impl ListingAttributes {
    /// Reject attribute sets that could never be matched by a sane filter.
    pub fn validate(&self) -> Result<(), DomainError> {
        for (name, value) in [
            ("title", &self.title),
            ("type", &self.kind),
            ("state", &self.state),
            ("city", &self.city),
            ("listedBy", &self.listed_by),
            ("listingType", &self.listing_type),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::validation(format!("`{name}` must not be empty")));
            }
        }

        for (name, value) in [
            ("price", self.price),
            ("areaSqFt", self.area_sq_ft),
            ("rating", self.rating),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(DomainError::validation(format!(
                    "`{name}` must be a non-negative number"
                )));
            }
        }

        if self.bedrooms < 0 || self.bathrooms < 0 {
            return Err(DomainError::validation(
                "`bedrooms` and `bathrooms` must not be negative",
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub listing_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A favorite joined with the listing it points at.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteWithListing {
    pub id: Uuid,
    pub user_id: Uuid,
    pub listing: ListingRecord,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRecord {
    pub id: Uuid,
    pub from_user: Uuid,
    pub to_user: Uuid,
    pub listing_id: Uuid,
    pub message: String,
    pub is_read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A recommendation as seen by its recipient.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedRecommendation {
    pub id: Uuid,
    pub from: UserSummary,
    pub listing: ListingRecord,
    pub message: String,
    pub is_read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

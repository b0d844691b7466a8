use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::filter::FilterDescriptor,
    application::pagination::PageWindow,
    application::repos::{
        CreateListingParams, ListingsRepo, ListingsWriteRepo, RepoError, UpdateListingParams,
    },
    domain::entities::ListingRecord,
};

use super::{LISTING_COLUMNS, PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
pub(super) struct ListingRow {
    id: Uuid,
    title: String,
    kind: String,
    price: f64,
    state: String,
    city: String,
    area_sq_ft: f64,
    bedrooms: i32,
    bathrooms: i32,
    amenities: Vec<String>,
    furnished: bool,
    available_from: OffsetDateTime,
    listed_by: String,
    tags: Vec<String>,
    color_theme: String,
    rating: f64,
    is_verified: bool,
    listing_type: String,
    created_by: Uuid,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ListingRow> for ListingRecord {
    fn from(row: ListingRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            kind: row.kind,
            price: row.price,
            state: row.state,
            city: row.city,
            area_sq_ft: row.area_sq_ft,
            bedrooms: row.bedrooms,
            bathrooms: row.bathrooms,
            amenities: row.amenities,
            furnished: row.furnished,
            available_from: row.available_from,
            listed_by: row.listed_by,
            tags: row.tags,
            color_theme: row.color_theme,
            rating: row.rating,
            is_verified: row.is_verified,
            listing_type: row.listing_type,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ListingsRepo for PostgresRepositories {
    async fn search_listings(
        &self,
        filter: &FilterDescriptor,
        window: PageWindow,
    ) -> Result<Vec<ListingRecord>, RepoError> {
        let offset = i64::try_from(window.offset)
            .map_err(|_| RepoError::InvalidInput {
                message: "page offset exceeds supported range".to_string(),
            })?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(LISTING_COLUMNS);
        qb.push(" FROM listings l WHERE TRUE");
        Self::apply_listing_filter(&mut qb, filter);
        qb.push(" ORDER BY l.created_at DESC, l.id DESC LIMIT ");
        qb.push_bind(i64::from(window.limit));
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<ListingRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ListingRecord::from).collect())
    }

    async fn count_listings(&self, filter: &FilterDescriptor) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM listings l WHERE TRUE");
        Self::apply_listing_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ListingRecord>, RepoError> {
        let sql = format!("SELECT {LISTING_COLUMNS} FROM listings l WHERE l.id = $1");
        let row = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ListingRecord::from))
    }
}

#[async_trait]
impl ListingsWriteRepo for PostgresRepositories {
    async fn create_listing(
        &self,
        params: CreateListingParams,
    ) -> Result<ListingRecord, RepoError> {
        let CreateListingParams {
            created_by,
            attributes,
        } = params;

        let sql = format!(
            "INSERT INTO listings AS l (id, title, kind, price, state, city, area_sq_ft, \
             bedrooms, bathrooms, amenities, furnished, available_from, listed_by, tags, \
             color_theme, rating, is_verified, listing_type, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19) \
             RETURNING {LISTING_COLUMNS}"
        );

        let row = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(attributes.title)
            .bind(attributes.kind)
            .bind(attributes.price)
            .bind(attributes.state)
            .bind(attributes.city)
            .bind(attributes.area_sq_ft)
            .bind(attributes.bedrooms)
            .bind(attributes.bathrooms)
            .bind(attributes.amenities)
            .bind(attributes.furnished)
            .bind(attributes.available_from)
            .bind(attributes.listed_by)
            .bind(attributes.tags)
            .bind(attributes.color_theme)
            .bind(attributes.rating)
            .bind(attributes.is_verified)
            .bind(attributes.listing_type)
            .bind(created_by)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(ListingRecord::from(row))
    }

    async fn update_listing(
        &self,
        params: UpdateListingParams,
    ) -> Result<ListingRecord, RepoError> {
        let UpdateListingParams { id, attributes } = params;

        let sql = format!(
            "UPDATE listings AS l SET title = $2, kind = $3, price = $4, state = $5, city = $6, \
             area_sq_ft = $7, bedrooms = $8, bathrooms = $9, amenities = $10, furnished = $11, \
             available_from = $12, listed_by = $13, tags = $14, color_theme = $15, \
             rating = $16, is_verified = $17, listing_type = $18, updated_at = now() \
             WHERE l.id = $1 \
             RETURNING {LISTING_COLUMNS}"
        );

        let row = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(id)
            .bind(attributes.title)
            .bind(attributes.kind)
            .bind(attributes.price)
            .bind(attributes.state)
            .bind(attributes.city)
            .bind(attributes.area_sq_ft)
            .bind(attributes.bedrooms)
            .bind(attributes.bathrooms)
            .bind(attributes.amenities)
            .bind(attributes.furnished)
            .bind(attributes.available_from)
            .bind(attributes.listed_by)
            .bind(attributes.tags)
            .bind(attributes.color_theme)
            .bind(attributes.rating)
            .bind(attributes.is_verified)
            .bind(attributes.listing_type)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;

        Ok(ListingRecord::from(row))
    }

    async fn delete_listing(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM listings WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

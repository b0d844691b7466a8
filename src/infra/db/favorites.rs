use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{FavoritesRepo, RepoError},
    domain::entities::{FavoriteRecord, FavoriteWithListing, ListingRecord},
};

use super::{LISTING_COLUMNS, PostgresRepositories, listings::ListingRow, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct FavoriteRow {
    id: Uuid,
    user_id: Uuid,
    listing_id: Uuid,
    created_at: OffsetDateTime,
}

impl From<FavoriteRow> for FavoriteRecord {
    fn from(row: FavoriteRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            listing_id: row.listing_id,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FavoriteListingRow {
    favorite_id: Uuid,
    favorite_user_id: Uuid,
    favorited_at: OffsetDateTime,
    #[sqlx(flatten)]
    listing: ListingRow,
}

#[async_trait]
impl FavoritesRepo for PostgresRepositories {
    async fn find_favorite(
        &self,
        user_id: Uuid,
        listing_id: Uuid,
    ) -> Result<Option<FavoriteRecord>, RepoError> {
        let row = sqlx::query_as::<_, FavoriteRow>(
            r#"
            SELECT id, user_id, listing_id, created_at
            FROM favorites
            WHERE user_id = $1 AND listing_id = $2
            "#,
        )
        .bind(user_id)
        .bind(listing_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(FavoriteRecord::from))
    }

    async fn insert_favorite(
        &self,
        user_id: Uuid,
        listing_id: Uuid,
    ) -> Result<FavoriteRecord, RepoError> {
        let row = sqlx::query_as::<_, FavoriteRow>(
            r#"
            INSERT INTO favorites (id, user_id, listing_id)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, listing_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(listing_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(FavoriteRecord::from(row))
    }

    async fn delete_favorite(&self, user_id: Uuid, listing_id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND listing_id = $2")
            .bind(user_id)
            .bind(listing_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<FavoriteWithListing>, RepoError> {
        let sql = format!(
            "SELECT f.id AS favorite_id, f.user_id AS favorite_user_id, \
             f.created_at AS favorited_at, {LISTING_COLUMNS} \
             FROM favorites f \
             INNER JOIN listings l ON l.id = f.listing_id \
             WHERE f.user_id = $1 \
             ORDER BY f.created_at DESC, f.id DESC"
        );

        let rows = sqlx::query_as::<_, FavoriteListingRow>(&sql)
            .bind(user_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| FavoriteWithListing {
                id: row.favorite_id,
                user_id: row.favorite_user_id,
                listing: ListingRecord::from(row.listing),
                created_at: row.favorited_at,
            })
            .collect())
    }
}

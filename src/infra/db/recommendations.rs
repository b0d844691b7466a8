use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{CreateRecommendationParams, RecommendationsRepo, RepoError},
    domain::entities::{ListingRecord, ReceivedRecommendation, RecommendationRecord, UserSummary},
};

use super::{LISTING_COLUMNS, PostgresRepositories, listings::ListingRow, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct RecommendationRow {
    id: Uuid,
    from_user: Uuid,
    to_user: Uuid,
    listing_id: Uuid,
    message: String,
    is_read: bool,
    created_at: OffsetDateTime,
}

impl From<RecommendationRow> for RecommendationRecord {
    fn from(row: RecommendationRow) -> Self {
        Self {
            id: row.id,
            from_user: row.from_user,
            to_user: row.to_user,
            listing_id: row.listing_id,
            message: row.message,
            is_read: row.is_read,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReceivedRow {
    recommendation_id: Uuid,
    message: String,
    is_read: bool,
    recommended_at: OffsetDateTime,
    sender_id: Uuid,
    sender_name: String,
    sender_email: String,
    #[sqlx(flatten)]
    listing: ListingRow,
}

#[async_trait]
impl RecommendationsRepo for PostgresRepositories {
    async fn create_recommendation(
        &self,
        params: CreateRecommendationParams,
    ) -> Result<RecommendationRecord, RepoError> {
        let row = sqlx::query_as::<_, RecommendationRow>(
            r#"
            INSERT INTO recommendations (id, from_user, to_user, listing_id, message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, from_user, to_user, listing_id, message, is_read, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(params.from_user)
        .bind(params.to_user)
        .bind(params.listing_id)
        .bind(params.message)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(RecommendationRecord::from(row))
    }

    async fn list_received(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ReceivedRecommendation>, RepoError> {
        let sql = format!(
            "SELECT r.id AS recommendation_id, r.message, r.is_read, \
             r.created_at AS recommended_at, u.id AS sender_id, u.name AS sender_name, \
             u.email AS sender_email, {LISTING_COLUMNS} \
             FROM recommendations r \
             INNER JOIN users u ON u.id = r.from_user \
             INNER JOIN listings l ON l.id = r.listing_id \
             WHERE r.to_user = $1 \
             ORDER BY r.created_at DESC, r.id DESC"
        );

        let rows = sqlx::query_as::<_, ReceivedRow>(&sql)
            .bind(user_id)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| ReceivedRecommendation {
                id: row.recommendation_id,
                from: UserSummary {
                    id: row.sender_id,
                    name: row.sender_name,
                    email: row.sender_email,
                },
                listing: ListingRecord::from(row.listing),
                message: row.message,
                is_read: row.is_read,
                created_at: row.recommended_at,
            })
            .collect())
    }
}

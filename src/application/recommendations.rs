//! Listing recommendations between users.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{
    CreateRecommendationParams, ListingsRepo, RecommendationsRepo, RepoError, UsersRepo, bounded,
};
use crate::domain::entities::{ReceivedRecommendation, RecommendationRecord};

const MAX_MESSAGE_CHARS: usize = 2_000;

#[derive(Debug, Error)]
pub enum RecommendationError {
    #[error("recipient user not found")]
    RecipientNotFound,
    #[error("listing not found")]
    ListingNotFound,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct SendRecommendation {
    pub to_email: String,
    pub listing_id: Uuid,
    pub message: String,
}

#[derive(Clone)]
pub struct RecommendationService {
    users: Arc<dyn UsersRepo>,
    listings: Arc<dyn ListingsRepo>,
    recommendations: Arc<dyn RecommendationsRepo>,
    timeout: Duration,
}

impl RecommendationService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        listings: Arc<dyn ListingsRepo>,
        recommendations: Arc<dyn RecommendationsRepo>,
        timeout: Duration,
    ) -> Self {
        Self {
            users,
            listings,
            recommendations,
            timeout,
        }
    }

    pub async fn send(
        &self,
        from_user: Uuid,
        request: SendRecommendation,
    ) -> Result<RecommendationRecord, RecommendationError> {
        let email = request.to_email.trim();
        if email.is_empty() {
            return Err(RecommendationError::Validation(
                "`toEmail` must not be empty".to_string(),
            ));
        }
        if request.message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(RecommendationError::Validation(format!(
                "`message` must be at most {MAX_MESSAGE_CHARS} characters"
            )));
        }

        let recipient = bounded(self.timeout, self.users.find_by_email(email))
            .await?
            .ok_or(RecommendationError::RecipientNotFound)?;

        let listing = bounded(self.timeout, self.listings.find_by_id(request.listing_id)).await?;
        if listing.is_none() {
            return Err(RecommendationError::ListingNotFound);
        }

        let record = bounded(
            self.timeout,
            self.recommendations
                .create_recommendation(CreateRecommendationParams {
                    from_user,
                    to_user: recipient.id,
                    listing_id: request.listing_id,
                    message: request.message,
                }),
        )
        .await?;

        info!(
            recommendation_id = %record.id,
            from_user = %from_user,
            to_user = %recipient.id,
            "Recommendation sent"
        );
        Ok(record)
    }

    pub async fn received(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ReceivedRecommendation>, RecommendationError> {
        Ok(bounded(self.timeout, self.recommendations.list_received(user_id)).await?)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::domain::entities::{UserSummary, fixtures};
    use crate::infra::memory::MemoryStore;

    fn user(name: &str) -> UserSummary {
        UserSummary {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
        }
    }

    fn setup() -> (RecommendationService, UserSummary, UserSummary, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let sender = store.add_user(user("Ada")).unwrap();
        let recipient = store.add_user(user("Tunde")).unwrap();
        let listing = store.seed_listing(sender.id, fixtures::attributes("Lagos", 1_000.0));
        let service =
            RecommendationService::new(store.clone(), store.clone(), store, Duration::from_secs(5));
        (service, sender, recipient, listing.id)
    }

    #[tokio::test]
    async fn recipient_sees_recommendation_with_sender_and_listing() {
        let (service, sender, recipient, listing_id) = setup();

        let record = service
            .send(
                sender.id,
                SendRecommendation {
                    to_email: "  TUNDE@example.com ".to_string(),
                    listing_id,
                    message: "Close to the office".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(record.to_user, recipient.id);
        assert!(!record.is_read);

        let inbox = service.received(recipient.id).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].from, sender);
        assert_eq!(inbox[0].listing.id, listing_id);
        assert!(service.received(sender.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_recipient_and_listing_are_reported() {
        let (service, sender, _recipient, listing_id) = setup();

        let err = service
            .send(
                sender.id,
                SendRecommendation {
                    to_email: "nobody@example.com".to_string(),
                    listing_id,
                    message: String::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RecommendationError::RecipientNotFound));

        let err = service
            .send(
                sender.id,
                SendRecommendation {
                    to_email: "tunde@example.com".to_string(),
                    listing_id: Uuid::new_v4(),
                    message: String::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RecommendationError::ListingNotFound));
    }

    #[tokio::test]
    async fn blank_email_is_a_validation_error() {
        let (service, sender, _recipient, listing_id) = setup();

        let err = service
            .send(
                sender.id,
                SendRecommendation {
                    to_email: "   ".to_string(),
                    listing_id,
                    message: String::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RecommendationError::Validation(_)));
    }

    /// User directory that never answers.
    struct StalledUsers;

    #[async_trait]
    impl UsersRepo for StalledUsers {
        async fn find_by_email(&self, _email: &str) -> Result<Option<UserSummary>, RepoError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_store_surfaces_timeout() {
        let store = Arc::new(MemoryStore::new());
        let sender = store.add_user(user("Ada")).unwrap();
        let listing = store.seed_listing(sender.id, fixtures::attributes("Lagos", 1_000.0));
        let service = RecommendationService::new(
            Arc::new(StalledUsers),
            store.clone(),
            store,
            Duration::from_millis(250),
        );

        let err = service
            .send(
                sender.id,
                SendRecommendation {
                    to_email: "tunde@example.com".to_string(),
                    listing_id: listing.id,
                    message: String::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RecommendationError::Repo(RepoError::Timeout)));
    }
}

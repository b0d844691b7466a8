use std::sync::Arc;

use sqlx::Error as SqlxError;

use crate::application::auth::AuthGate;
use crate::application::favorites::FavoriteService;
use crate::application::listings::ListingService;
use crate::application::recommendations::RecommendationService;
use crate::application::search::ListingSearchService;
use crate::infra::db::PostgresRepositories;

/// What `/health` probes.
#[derive(Clone)]
pub enum StoreHealth {
    Postgres(Arc<PostgresRepositories>),
    /// The process-local store is always reachable.
    Memory,
}

impl StoreHealth {
    pub async fn check(&self) -> Result<(), SqlxError> {
        match self {
            StoreHealth::Postgres(db) => db.health_check().await,
            StoreHealth::Memory => Ok(()),
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub search: ListingSearchService,
    pub listings: Arc<ListingService>,
    pub favorites: Arc<FavoriteService>,
    pub recommendations: Arc<RecommendationService>,
    pub auth: Arc<dyn AuthGate>,
    pub store: StoreHealth,
}

//! Authentication capability consumed by mutation and relational endpoints.

use async_trait::async_trait;
use uuid::Uuid;

/// The authenticated subject of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
}

#[async_trait]
pub trait AuthGate: Send + Sync {
    /// Resolve a bearer token, or `None` when it is unknown.
    async fn authenticate(&self, token: &str) -> Option<Principal>;
}

//! HTTP surface: listing search, listing writes, favorites and recommendations.

mod error;
mod handlers;
mod middleware;
mod state;

pub use error::{ApiError, ApiErrorBody, ApiErrorMessage, codes};
pub use handlers::listings::CACHE_STATUS_HEADER;
pub use middleware::RequestContext;
pub use state::{ApiState, StoreHealth};

use axum::Router;
use axum::middleware as axum_middleware;
use axum::routing::{get, post};

use handlers::{favorites, listings, recommendations};

pub fn build_router(state: ApiState) -> Router {
    let protected = Router::new()
        .route("/api/listings", post(listings::create_listing))
        .route(
            "/api/listings/{id}",
            axum::routing::put(listings::update_listing).delete(listings::delete_listing),
        )
        .route("/api/favorites", get(favorites::list_favorites))
        .route(
            "/api/favorites/{listing_id}",
            post(favorites::add_favorite).delete(favorites::remove_favorite),
        )
        .route(
            "/api/recommendations",
            get(recommendations::list_received).post(recommendations::send_recommendation),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_principal,
        ));

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/listings", get(listings::search_listings))
        .route("/api/listings/{id}", get(listings::get_listing))
        .merge(protected)
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::auth::Principal;
use crate::infra::http::error::ApiError;
use crate::infra::http::state::ApiState;

pub async fn list_favorites(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    let favorites = state.favorites.list(principal.user_id).await?;
    Ok(Json(favorites))
}

pub async fn add_favorite(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(listing_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let favorite = state.favorites.add(principal.user_id, listing_id).await?;
    Ok((StatusCode::CREATED, Json(favorite)))
}

pub async fn remove_favorite(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(listing_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.favorites.remove(principal.user_id, listing_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

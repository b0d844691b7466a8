//! Listing search and CRUD handlers

use axum::Json;
use axum::body::Body;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Path, Query, State};
use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::application::auth::Principal;
use crate::domain::entities::ListingAttributes;
use crate::infra::http::error::ApiError;
use crate::infra::http::state::ApiState;

pub const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache");

/// Raw pairs keep repeated parameters such as `tags=a&tags=b`.
pub async fn search_listings(
    State(state): State<ApiState>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params?;
    let outcome = state
        .search
        .search(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .await?;

    let mut response = Response::new(Body::from(outcome.payload));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        CACHE_STATUS_HEADER,
        HeaderValue::from_static(outcome.status.as_str()),
    );
    Ok(response)
}

pub async fn get_listing(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let listing = state.listings.get(id).await?;
    Ok(Json(listing))
}

pub async fn create_listing(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<ListingAttributes>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(attributes) = payload?;
    let listing = state.listings.create(principal.user_id, attributes).await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

pub async fn update_listing(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    payload: Result<Json<ListingAttributes>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(attributes) = payload?;
    let listing = state
        .listings
        .update(principal.user_id, id, attributes)
        .await?;
    Ok(Json(listing))
}

pub async fn delete_listing(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.listings.delete(principal.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

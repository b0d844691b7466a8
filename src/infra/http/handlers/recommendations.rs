use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use uuid::Uuid;

use crate::application::auth::Principal;
use crate::application::recommendations::SendRecommendation;
use crate::infra::http::error::ApiError;
use crate::infra::http::state::ApiState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRecommendationRequest {
    pub to_email: String,
    pub listing_id: Uuid,
    #[serde(default)]
    pub message: String,
}

impl From<SendRecommendationRequest> for SendRecommendation {
    fn from(request: SendRecommendationRequest) -> Self {
        Self {
            to_email: request.to_email,
            listing_id: request.listing_id,
            message: request.message,
        }
    }
}

pub async fn list_received(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    let received = state.recommendations.received(principal.user_id).await?;
    Ok(Json(received))
}

pub async fn send_recommendation(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<SendRecommendationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let record = state
        .recommendations
        .send(principal.user_id, request.into())
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

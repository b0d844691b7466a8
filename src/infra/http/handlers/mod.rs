pub mod favorites;
pub mod listings;
pub mod recommendations;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::error::ErrorReport;

use super::state::ApiState;

pub async fn index() -> &'static str {
    concat!("abode ", env!("CARGO_PKG_VERSION"), "\n")
}

pub async fn health(State(state): State<ApiState>) -> Response {
    match state.store.check().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

//! Account handlers.

use super::AccountResponse;
use crate::api::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

/// GET /account - Connected account
#[utoipa::path(
    get,
    path = "/account",
    tag = "account",
    responses(
        (status = 200, description = "Connected account (email is null when signed out)", body = AccountResponse),
        (status = 502, description = "Profile request failed", body = crate::error::ApiError)
    )
)]
pub async fn get_account(State(state): State<AppState>) -> impl IntoResponse {
    match state.analyzer.connected_account().await {
        Ok(email) => (StatusCode::OK, Json(AccountResponse { email })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /logout - Drop the cached token and all stored data
#[utoipa::path(
    post,
    path = "/logout",
    tag = "account",
    responses(
        (status = 204, description = "Logged out"),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    match state.analyzer.logout().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Logout failed");
            e.into_response()
        }
    }
}

//! Analysis handlers.

use crate::api::AppState;
use crate::error::Error;
use crate::footprint::Comparisons;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

/// POST /analyze - Run a full analysis
///
/// Responds once the run has finished. Progress is published on `/events`
/// while the request is pending.
#[utoipa::path(
    post,
    path = "/analyze",
    tag = "analysis",
    responses(
        (status = 200, description = "Analysis finished and was stored", body = crate::types::AnalysisResult),
        (status = 401, description = "No token available", body = crate::error::ApiError),
        (status = 502, description = "Gmail API failure", body = crate::error::ApiError),
        (status = 503, description = "Still rate limited after all retries", body = crate::error::ApiError)
    )
)]
pub async fn trigger_analysis(State(state): State<AppState>) -> impl IntoResponse {
    match state.analyzer.trigger_analysis().await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /results - Last stored result
#[utoipa::path(
    get,
    path = "/results",
    tag = "analysis",
    responses(
        (status = 200, description = "Stored result", body = crate::types::AnalysisResult),
        (status = 404, description = "No analysis has completed yet", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn get_results(State(state): State<AppState>) -> impl IntoResponse {
    match state.analyzer.last_result().await {
        Ok(Some(result)) => (StatusCode::OK, Json(result)).into_response(),
        Ok(None) => Error::NotFound("analysis result".to_string()).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load stored result");
            e.into_response()
        }
    }
}

/// GET /results/comparisons - Everyday equivalents of the stored result
#[utoipa::path(
    get,
    path = "/results/comparisons",
    tag = "analysis",
    responses(
        (status = 200, description = "Car kilometres and meals", body = crate::footprint::Comparisons),
        (status = 404, description = "No analysis has completed yet", body = crate::error::ApiError)
    )
)]
pub async fn get_comparisons(State(state): State<AppState>) -> impl IntoResponse {
    match state.analyzer.last_result().await {
        Ok(Some(result)) => (StatusCode::OK, Json(Comparisons::from_result(&result))).into_response(),
        Ok(None) => Error::NotFound("analysis result".to_string()).into_response(),
        Err(e) => e.into_response(),
    }
}

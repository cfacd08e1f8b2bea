//! REST API server module
//!
//! Exposes the analyzer to UI collaborators (an extension popup, a page
//! widget) over HTTP, with a server-sent events stream for progress.

use crate::{CarbonAnalyzer, Config, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Analysis
/// - `POST /analyze` - Run an analysis and return its result
/// - `GET /results` - Last stored result
/// - `GET /results/comparisons` - Car and meal equivalents of the last result
///
/// ## Account
/// - `GET /account` - Connected account address
/// - `POST /logout` - Drop the token and all stored data
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /events` - Server-sent events stream
pub fn create_router(analyzer: Arc<CarbonAnalyzer>, config: Arc<Config>) -> Router {
    let state = AppState::new(analyzer);

    let router = Router::new()
        // Analysis
        .route("/analyze", post(routes::trigger_analysis))
        .route("/results", get(routes::get_results))
        .route("/results/comparisons", get(routes::get_comparisons))
        // Account
        .route("/account", get(routes::get_account))
        .route("/logout", post(routes::logout))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.server.cors_enabled {
        let cors = build_cors_layer(&config.server.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` anywhere in the list, or an empty list, allows any origin.
/// Extension origins (`chrome-extension://<id>`) are listed like any other.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the server stops.
///
/// # Example
///
/// ```no_run
/// use mailbox_carbon::auth::StaticTokenProvider;
/// use mailbox_carbon::{CarbonAnalyzer, Config};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let tokens = Arc::new(StaticTokenProvider::new("ya29.token"));
/// let analyzer = Arc::new(CarbonAnalyzer::new((*config).clone(), tokens).await?);
///
/// mailbox_carbon::api::start_api_server(analyzer, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(analyzer: Arc<CarbonAnalyzer>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(analyzer, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

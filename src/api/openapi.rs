//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI specification for the mailbox-carbon REST API using
//! utoipa for compile-time document generation. Served at `/openapi.json`.

use utoipa::OpenApi;

/// OpenAPI documentation for the mailbox-carbon REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "mailbox-carbon REST API",
        version = "0.1.0",
        description = "Estimate the carbon footprint of a Gmail mailbox and follow the analysis progress",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:6790", description = "Local server")
    ),
    paths(
        // Analysis
        crate::api::routes::trigger_analysis,
        crate::api::routes::get_results,
        crate::api::routes::get_comparisons,

        // Account
        crate::api::routes::get_account,
        crate::api::routes::logout,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        crate::types::AnalysisResult,
        crate::types::Progress,
        crate::footprint::Comparisons,
        crate::api::routes::AccountResponse,
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "analysis", description = "Run an analysis and read the stored result"),
        (name = "account", description = "Connected account and logout"),
        (name = "system", description = "Health check, OpenAPI spec, event stream"),
    )
)]
pub struct ApiDoc;

//! Error types for mailbox-carbon
//!
//! This module provides:
//! - The crate-wide [`Error`] taxonomy (auth, provider API, batch transport, storage)
//! - HTTP status code mapping for the REST surface
//! - Structured JSON error bodies with machine-readable codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for mailbox-carbon operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for mailbox-carbon
///
/// List, profile and batch transport failures are fatal to an analysis run.
/// Malformed batch fragments never become an `Error`; the decoder drops them.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "pipeline.batch_size")
        key: Option<String>,
    },

    /// No bearer token could be obtained from the identity provider
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Non-success status from the list or profile endpoint
    #[error("API error: {status}")]
    Api {
        /// HTTP status code returned by the provider
        status: u16,
    },

    /// Non-success, non-429 status from the batch endpoint
    #[error("Batch failed: {status} - {body}")]
    Batch {
        /// HTTP status code returned by the batch endpoint
        status: u16,
        /// Response body text, as returned by the provider
        body: String,
    },

    /// The batch endpoint answered with a success status but a blank body
    #[error("Empty response from Gmail API")]
    EmptyBatchResponse,

    /// The batch endpoint kept answering HTTP 429
    ///
    /// A single 429 is recovered locally; this variant only escapes once the
    /// configured retry budget is used up.
    #[error("rate limited by Gmail API after {attempts} attempts")]
    RateLimited {
        /// Number of requests sent for the batch, including the first
        attempts: u32,
    },

    /// No result stored yet, or another missing resource
    #[error("not found: {0}")]
    NotFound(String),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "batch_failed",
///     "message": "Batch failed: 500 - backend error",
///     "details": { "status": 500 }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "auth_failed", "not_found")
    pub code: String,

    /// Human-readable error message, suitable for showing in the popup
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Config { .. } => 400,
            Error::Auth(_) => 401,
            Error::NotFound(_) => 404,

            // Upstream provider failures
            Error::Api { .. } => 502,
            Error::Batch { .. } => 502,
            Error::EmptyBatchResponse => 502,
            Error::Network(_) => 502,
            Error::RateLimited { .. } => 503,

            Error::Database(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Auth(_) => "auth_failed",
            Error::NotFound(_) => "not_found",
            Error::Api { .. } => "api_error",
            Error::Batch { .. } => "batch_failed",
            Error::EmptyBatchResponse => "empty_batch_response",
            Error::Network(_) => "network_error",
            Error::RateLimited { .. } => "rate_limited",
            Error::Database(_) => "database_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Api { status } => Some(serde_json::json!({ "status": status })),
            Error::Batch { status, .. } => Some(serde_json::json!({ "status": status })),
            Error::RateLimited { attempts } => Some(serde_json::json!({ "attempts": attempts })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({ "key": key })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}

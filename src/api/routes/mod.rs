//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`analysis`] - Running an analysis and reading its result
//! - [`account`] - Connected account and logout
//! - [`system`] - Health, events, OpenAPI

use serde::{Deserialize, Serialize};

mod account;
mod analysis;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use account::*;
pub use analysis::*;
pub use system::*;

/// Response for GET /account
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AccountResponse {
    /// Address of the connected account, null when signed out
    pub email: Option<String>,
}

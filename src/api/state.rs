//! Application state for the API server

use crate::CarbonAnalyzer;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
#[derive(Clone)]
pub struct AppState {
    /// The analyzer handling every request
    pub analyzer: Arc<CarbonAnalyzer>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(analyzer: Arc<CarbonAnalyzer>) -> Self {
        Self { analyzer }
    }
}

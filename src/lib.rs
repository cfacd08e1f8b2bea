//! # mailbox-carbon
//!
//! Estimate the carbon footprint of a Gmail mailbox from message sizes.
//!
//! The crate pages through every message id with the list endpoint, fetches
//! size estimates 100 at a time through the multipart batch endpoint, and
//! folds them into a CO2 estimate with a two-bucket model (4 g for a plain
//! message, 35 g above 100 kB). The last result is cached so UI
//! collaborators can show it without re-running the analysis.
//!
//! ## Design
//!
//! - **Library-first** - No CLI; embed [`CarbonAnalyzer`] or serve the small
//!   HTTP surface in [`api`]
//! - **Quota-aware** - Fixed page and batch sizes, cohort pacing, and a
//!   bounded fixed-delay retry on HTTP 429
//! - **Event-driven** - Progress is broadcast to subscribers, no polling
//!   required
//!
//! ## Quick Start
//!
//! ```no_run
//! use mailbox_carbon::auth::StaticTokenProvider;
//! use mailbox_carbon::{CarbonAnalyzer, Config, Event};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tokens = Arc::new(StaticTokenProvider::new("ya29.oauth-token"));
//!     let analyzer = CarbonAnalyzer::new(Config::default(), tokens).await?;
//!
//!     let mut events = analyzer.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             if let Event::Progress { percentage, .. } = event {
//!                 println!("{percentage}%");
//!             }
//!         }
//!     });
//!
//!     let result = analyzer.trigger_analysis().await?;
//!     println!("{} kg CO2", result.total_co2_kg);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Analysis entry point
pub mod analyzer;
/// REST API module
pub mod api;
/// Bearer token acquisition
pub mod auth;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Size-to-CO2 model and aggregation
pub mod footprint;
/// Gmail client and retrieval stages
pub mod gmail;
/// Batch cohort scheduling
pub mod orchestrator;
/// Fixed-delay retry on rate limiting
pub mod retry;
/// Result persistence
pub mod store;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use analyzer::CarbonAnalyzer;
pub use auth::{StaticTokenProvider, TokenProvider};
pub use config::Config;
pub use db::Database;
pub use error::{ApiError, DatabaseError, Error, ErrorDetail, Result, ToHttpStatus};
pub use footprint::Comparisons;
pub use gmail::{GmailClient, MailApi};
pub use store::{KeyValueStore, MemoryStore, ResultStore};
pub use types::{AnalysisResult, Event, MessageDetail, MessageRef, Progress};

/// Serve the REST API until a termination signal arrives.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// Returns early with the server's error if it stops on its own.
///
/// # Example
///
/// ```no_run
/// use mailbox_carbon::{CarbonAnalyzer, Config, StaticTokenProvider, serve_until_signal};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let tokens = Arc::new(StaticTokenProvider::new("ya29.oauth-token"));
///     let analyzer = CarbonAnalyzer::new(Config::default(), tokens).await?;
///
///     serve_until_signal(analyzer).await?;
///     Ok(())
/// }
/// ```
pub async fn serve_until_signal(analyzer: CarbonAnalyzer) -> Result<()> {
    let mut server = analyzer.spawn_api_server();

    tokio::select! {
        joined = &mut server => match joined {
            Ok(result) => result,
            Err(e) => Err(Error::ApiServerError(format!("API server task failed: {}", e))),
        },
        _ = wait_for_signal() => {
            server.abort();
            tracing::info!("API server shut down");
            Ok(())
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}

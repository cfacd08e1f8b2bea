//! Bearer token acquisition
//!
//! The interactive sign-in flow lives outside this crate. The analyzer only
//! asks a [`TokenProvider`] for an opaque OAuth token with the
//! `gmail.readonly` scope and hands it back for invalidation on logout.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Error, Result};

/// Source of OAuth bearer tokens
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Get a token
    ///
    /// With `interactive` the provider may prompt the user; without it, only
    /// an already cached token is returned.
    ///
    /// # Errors
    /// [`Error::Auth`] when no token can be obtained.
    async fn acquire_token(&self, interactive: bool) -> Result<String>;

    /// Drop `token` from the provider's cache
    async fn invalidate(&self, token: &str) -> Result<()>;
}

/// Token provider holding one pre-obtained token
///
/// Suitable for tokens minted by an external OAuth flow. Interactive and
/// non-interactive acquisition behave the same.
#[derive(Debug, Default)]
pub struct StaticTokenProvider {
    token: RwLock<Option<String>>,
}

impl StaticTokenProvider {
    /// Provider that returns `token` until it is invalidated
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    /// Provider with no token (every acquisition fails)
    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn acquire_token(&self, interactive: bool) -> Result<String> {
        match self.token.read().await.as_ref() {
            Some(token) => Ok(token.clone()),
            None => {
                tracing::debug!(interactive, "no cached token");
                Err(Error::Auth("No token received".to_string()))
            }
        }
    }

    async fn invalidate(&self, token: &str) -> Result<()> {
        let mut cached = self.token.write().await;
        if cached.as_deref() == Some(token) {
            *cached = None;
            tracing::info!("Cached token invalidated");
        }
        Ok(())
    }
}

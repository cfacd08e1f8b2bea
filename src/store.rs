//! Result persistence
//!
//! The last [`AnalysisResult`] is cached under [`RESULTS_KEY`] so UI
//! collaborators can show it without re-running the analysis. Storage goes
//! through the [`KeyValueStore`] trait; [`Database`] and [`MemoryStore`]
//! implement it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::db::Database;
use crate::error::Result;
use crate::types::AnalysisResult;

/// Storage key of the cached result
pub const RESULTS_KEY: &str = "carbonResults";

/// JSON key-value storage
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Value under `key`, if present
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Remove every key
    async fn clear(&self) -> Result<()>;
}

#[async_trait]
impl KeyValueStore for Database {
    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.put_value(key, &serde_json::to_string(&value)?).await
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        match self.get_value(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn clear(&self) -> Result<()> {
        self.clear_values().await
    }
}

/// Process-local store, lost on drop
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}

/// Typed access to the cached result
#[derive(Clone)]
pub struct ResultStore {
    backend: Arc<dyn KeyValueStore>,
}

impl ResultStore {
    /// Wrap a key-value backend
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Replace the cached result
    pub async fn save(&self, result: &AnalysisResult) -> Result<()> {
        self.backend
            .set(RESULTS_KEY, serde_json::to_value(result)?)
            .await
    }

    /// The cached result, if one was saved
    ///
    /// # Errors
    /// A stored blob that no longer matches the result schema is reported as
    /// [`Error::Serialization`](crate::Error::Serialization).
    pub async fn load(&self) -> Result<Option<AnalysisResult>> {
        match self.backend.get(RESULTS_KEY).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Drop everything in the backend, not only the result
    pub async fn clear(&self) -> Result<()> {
        self.backend.clear().await
    }
}

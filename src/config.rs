//! Configuration types for mailbox-carbon

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Largest number of sub-requests the Gmail batch endpoint accepts in one call
pub const MAX_BATCH_SIZE: usize = 100;

/// Largest `maxResults` the Gmail list endpoint honours
pub const MAX_PAGE_SIZE: usize = 500;

/// Main configuration for [`CarbonAnalyzer`](crate::CarbonAnalyzer)
///
/// Fields are organized into logical sub-configs:
/// - [`gmail`](GmailConfig) - provider endpoints and HTTP client settings
/// - [`pipeline`](PipelineConfig) - paging, batching, parallelism and pacing
/// - [`retry`](RateLimitConfig) - behaviour on HTTP 429 from the batch endpoint
/// - [`analysis`](AnalysisConfig) - how much of the mailbox to analyze
/// - [`persistence`](PersistenceConfig) - where the last result is cached
/// - [`server`](ApiConfig) - the HTTP surface consumed by UI collaborators
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Gmail endpoints and client settings
    #[serde(default)]
    pub gmail: GmailConfig,

    /// Retrieval pipeline tuning
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Rate-limit retry behaviour for batch requests
    #[serde(default)]
    pub retry: RateLimitConfig,

    /// Analysis scope
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Result persistence
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// REST API server
    #[serde(default)]
    pub server: ApiConfig,
}

impl Config {
    /// Check the tuning knobs against the provider's hard limits
    ///
    /// # Errors
    /// Returns [`Error::Config`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        let pipeline = &self.pipeline;

        if pipeline.batch_size == 0 || pipeline.batch_size > MAX_BATCH_SIZE {
            return Err(Error::Config {
                message: format!(
                    "batch_size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                    pipeline.batch_size
                ),
                key: Some("pipeline.batch_size".to_string()),
            });
        }

        if pipeline.page_size == 0 || pipeline.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config {
                message: format!(
                    "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                    pipeline.page_size
                ),
                key: Some("pipeline.page_size".to_string()),
            });
        }

        if pipeline.parallel_batches == 0 {
            return Err(Error::Config {
                message: "parallel_batches must be at least 1".to_string(),
                key: Some("pipeline.parallel_batches".to_string()),
            });
        }

        url::Url::parse(&self.gmail.api_base).map_err(|e| Error::Config {
            message: format!("invalid api_base URL: {e}"),
            key: Some("gmail.api_base".to_string()),
        })?;
        url::Url::parse(&self.gmail.batch_url).map_err(|e| Error::Config {
            message: format!("invalid batch_url URL: {e}"),
            key: Some("gmail.batch_url".to_string()),
        })?;

        Ok(())
    }
}

/// Gmail endpoint configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GmailConfig {
    /// Base URL of the REST API, without a trailing slash
    /// (default: "https://www.googleapis.com/gmail/v1")
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Batch endpoint URL (default: "https://gmail.googleapis.com/batch/gmail/v1")
    #[serde(default = "default_batch_url")]
    pub batch_url: String,

    /// Path prefix written into each batch sub-request (default: "/gmail/v1")
    #[serde(default = "default_batch_path_prefix")]
    pub batch_path_prefix: String,

    /// Per-request timeout for the HTTP client (default: 60 seconds)
    #[serde(default = "default_request_timeout", with = "duration_millis")]
    pub request_timeout: Duration,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            batch_url: default_batch_url(),
            batch_path_prefix: default_batch_path_prefix(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Retrieval pipeline tuning knobs
///
/// Defaults mirror the provider's published quotas. Tests shrink the sizes
/// and pair them with a recording [`Sleeper`](crate::retry::Sleeper) so no
/// wall-clock time is spent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum ids requested per list page (default: 500)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Pause between consecutive list pages (default: 100ms)
    #[serde(default = "default_page_delay", with = "duration_millis")]
    pub page_delay: Duration,

    /// Ids per multiplexed batch request (default: 100)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Batches executed concurrently per cohort (default: 1)
    #[serde(default = "default_parallel_batches")]
    pub parallel_batches: usize,

    /// Pause between cohorts when the run has many batches (default: 2000ms)
    #[serde(default = "default_group_delay_high", with = "duration_millis")]
    pub group_delay_high: Duration,

    /// Pause between cohorts otherwise (default: 1500ms)
    #[serde(default = "default_group_delay_low", with = "duration_millis")]
    pub group_delay_low: Duration,

    /// Batch count above which `group_delay_high` applies (default: 50)
    #[serde(default = "default_batch_count_threshold")]
    pub batch_count_threshold: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            page_delay: default_page_delay(),
            batch_size: default_batch_size(),
            parallel_batches: default_parallel_batches(),
            group_delay_high: default_group_delay_high(),
            group_delay_low: default_group_delay_low(),
            batch_count_threshold: default_batch_count_threshold(),
        }
    }
}

impl PipelineConfig {
    /// Delay between cohorts for a run with `batch_count` batches
    pub fn group_delay(&self, batch_count: usize) -> Duration {
        if batch_count > self.batch_count_threshold {
            self.group_delay_high
        } else {
            self.group_delay_low
        }
    }
}

/// Behaviour when the batch endpoint answers HTTP 429
///
/// The delay is fixed: there is no exponential backoff and no jitter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Wait before re-sending a throttled batch (default: 2000ms)
    #[serde(default = "default_retry_delay", with = "duration_millis")]
    pub retry_delay: Duration,

    /// Retries of the same batch before giving up (default: 10)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            retry_delay: default_retry_delay(),
            max_retries: default_max_retries(),
        }
    }
}

/// Analysis scope
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Analyze at most this many messages (None = the whole mailbox)
    #[serde(default)]
    pub max_messages: Option<usize>,
}

/// Persistence configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// SQLite database holding the cached result (default: "mailbox-carbon.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// REST API server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:6790)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS so extension pages can call the API (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed origins; "*" or an empty list allows any (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_api_base() -> String {
    "https://www.googleapis.com/gmail/v1".to_string()
}

fn default_batch_url() -> String {
    "https://gmail.googleapis.com/batch/gmail/v1".to_string()
}

fn default_batch_path_prefix() -> String {
    "/gmail/v1".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_page_size() -> usize {
    MAX_PAGE_SIZE
}

fn default_page_delay() -> Duration {
    Duration::from_millis(100)
}

fn default_batch_size() -> usize {
    MAX_BATCH_SIZE
}

fn default_parallel_batches() -> usize {
    1
}

fn default_group_delay_high() -> Duration {
    Duration::from_millis(2000)
}

fn default_group_delay_low() -> Duration {
    Duration::from_millis(1500)
}

fn default_batch_count_threshold() -> usize {
    50
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(2000)
}

fn default_max_retries() -> u32 {
    10
}

fn default_database_path() -> PathBuf {
    PathBuf::from("mailbox-carbon.db")
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6790))
}

fn default_true() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Durations are written as whole milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_provider_limits() {
        let config = Config::default();

        assert_eq!(config.pipeline.page_size, 500);
        assert_eq!(config.pipeline.batch_size, 100);
        assert_eq!(config.pipeline.parallel_batches, 1);
        assert_eq!(config.pipeline.page_delay, Duration::from_millis(100));
        assert_eq!(config.retry.retry_delay, Duration::from_millis(2000));
        assert!(config.analysis.max_messages.is_none());
        config.validate().expect("default config must validate");
    }

    #[test]
    fn group_delay_switches_above_threshold() {
        let pipeline = PipelineConfig::default();

        assert_eq!(pipeline.group_delay(3), Duration::from_millis(1500));
        assert_eq!(
            pipeline.group_delay(50),
            Duration::from_millis(1500),
            "threshold itself still uses the low delay"
        );
        assert_eq!(pipeline.group_delay(51), Duration::from_millis(2000));
    }

    #[test]
    fn empty_json_deserializes_to_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();

        assert_eq!(config.pipeline.batch_size, MAX_BATCH_SIZE);
        assert_eq!(config.gmail.api_base, default_api_base());
        assert_eq!(config.server.bind_address, default_bind_address());
    }

    #[test]
    fn durations_serialize_as_millis() {
        let json = serde_json::to_value(PipelineConfig::default()).unwrap();

        assert_eq!(json["page_delay"], 100);
        assert_eq!(json["group_delay_high"], 2000);

        let parsed: PipelineConfig =
            serde_json::from_str(r#"{"page_delay": 0, "group_delay_low": 5}"#).unwrap();
        assert_eq!(parsed.page_delay, Duration::ZERO);
        assert_eq!(parsed.group_delay_low, Duration::from_millis(5));
    }

    #[test]
    fn validate_rejects_oversized_batch() {
        let mut config = Config::default();
        config.pipeline.batch_size = 101;

        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("pipeline.batch_size"));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_zero_parallelism_and_page_size() {
        let mut config = Config::default();
        config.pipeline.parallel_batches = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pipeline.page_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pipeline.page_size = 501;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_endpoint() {
        let mut config = Config::default();
        config.gmail.batch_url = "not a url".to_string();

        match config.validate() {
            Err(Error::Config { key, .. }) => {
                assert_eq!(key.as_deref(), Some("gmail.batch_url"));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }
}

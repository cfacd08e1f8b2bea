//! Batch request encoding and execution
//!
//! One batch packs up to 100 metadata sub-requests into a single
//! `multipart/mixed` POST. The executor sends it, re-sends it unchanged on
//! HTTP 429, and hands the body to the decoder.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::RateLimitConfig;
use crate::error::{Error, Result};
use crate::retry::{Sleeper, retry_rate_limited};
use crate::types::MessageDetail;

use super::MailApi;
use super::decode::parse_batch_response;

/// HTTP status the batch endpoint uses for throttling
const TOO_MANY_REQUESTS: u16 = 429;

/// Raw answer of the batch endpoint
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchResponse {
    /// HTTP status code
    pub status: u16,
    /// Body text (multipart on success, provider error text otherwise)
    pub body: String,
}

impl BatchResponse {
    /// Construct a response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Generate a boundary token that no other in-flight batch shares
///
/// Combines the wall-clock time in nanoseconds with a process-wide counter,
/// so two batches started within the same clock tick still differ.
pub fn unique_boundary() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let nanos = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default();
    let sequence = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("batch_boundary_{nanos}_{sequence}")
}

/// Encode ids as one multipart batch body
///
/// Each part is a `GET <path_prefix>/users/me/messages/<id>?format=metadata`
/// sub-request tagged `<item<N>>`. The metadata projection leaves out body
/// and attachment payloads.
pub fn encode_batch_body(ids: &[String], boundary: &str, path_prefix: &str) -> String {
    let prefix = path_prefix.trim_end_matches('/');
    let mut body = String::with_capacity(ids.len() * 160);

    for (index, id) in ids.iter().enumerate() {
        body.push_str(&format!("--{boundary}\r\n"));
        body.push_str("Content-Type: application/http\r\n");
        body.push_str(&format!("Content-ID: <item{index}>\r\n\r\n"));
        body.push_str(&format!(
            "GET {prefix}/users/me/messages/{id}?format=metadata\r\n\r\n"
        ));
    }

    body.push_str(&format!("--{boundary}--"));
    body
}

/// Sends one batch and decodes its details
pub struct BatchExecutor {
    api: Arc<dyn MailApi>,
    sleeper: Arc<dyn Sleeper>,
    retry: RateLimitConfig,
    path_prefix: String,
}

impl BatchExecutor {
    /// Create an executor
    ///
    /// # Arguments
    /// * `api` - Provider the batch is posted to
    /// * `sleeper` - Delay used between rate-limit retries
    /// * `retry` - Retry delay and budget
    /// * `path_prefix` - Path prefix of each sub-request (e.g. "/gmail/v1")
    pub fn new(
        api: Arc<dyn MailApi>,
        sleeper: Arc<dyn Sleeper>,
        retry: RateLimitConfig,
        path_prefix: impl Into<String>,
    ) -> Self {
        Self {
            api,
            sleeper,
            retry,
            path_prefix: path_prefix.into(),
        }
    }

    /// Retrieve the details of one batch of ids
    ///
    /// # Errors
    /// - [`Error::RateLimited`] when every attempt inside the retry budget got HTTP 429
    /// - [`Error::Batch`] on any other non-success status
    /// - [`Error::EmptyBatchResponse`] when a success carries a blank body
    /// - transport errors from the provider
    pub async fn execute(&self, token: &str, ids: &[String]) -> Result<Vec<MessageDetail>> {
        let boundary = unique_boundary();
        let body = encode_batch_body(ids, &boundary, &self.path_prefix);
        let boundary = boundary.as_str();

        let response_text = retry_rate_limited(&self.retry, self.sleeper.as_ref(), |attempt| {
            let body = body.clone();
            async move {
                let response = self.api.post_batch(token, boundary, body).await?;

                if response.status == TOO_MANY_REQUESTS {
                    return Err(Error::RateLimited { attempts: attempt });
                }
                if !response.is_success() {
                    return Err(Error::Batch {
                        status: response.status,
                        body: response.body,
                    });
                }
                Ok(response.body)
            }
        })
        .await
        .inspect_err(|e| tracing::error!(batch_size = ids.len(), error = %e, "Batch error"))?;

        if response_text.trim().is_empty() {
            tracing::error!(batch_size = ids.len(), "Empty response from batch endpoint");
            return Err(Error::EmptyBatchResponse);
        }

        let details = parse_batch_response(&response_text);
        tracing::debug!(
            requested = ids.len(),
            decoded = details.len(),
            "batch decoded"
        );
        Ok(details)
    }
}

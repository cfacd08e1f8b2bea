//! Gmail REST client and retrieval pipeline stages
//!
//! - [`list`] - cursor-paged listing of message ids
//! - [`batch`] - multipart batch encoding, sending and 429 handling
//! - [`decode`] - demultiplexing of batch response bodies
//!
//! The stages talk to the provider through the [`MailApi`] trait;
//! [`GmailClient`] is the reqwest implementation.

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::config::GmailConfig;
use crate::error::{Error, Result};
use crate::types::{MessageListPage, Profile};

pub mod batch;
pub mod decode;
pub mod list;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use batch::{BatchExecutor, BatchResponse};
pub use list::MessageLister;

/// Provider operations used by the pipeline
#[async_trait]
pub trait MailApi: Send + Sync {
    /// Fetch one page of message ids
    ///
    /// # Errors
    /// [`Error::Api`] on a non-success status.
    async fn list_messages(
        &self,
        token: &str,
        page_size: usize,
        page_token: Option<&str>,
    ) -> Result<MessageListPage>;

    /// Fetch the mailbox profile
    ///
    /// # Errors
    /// [`Error::Api`] on a non-success status.
    async fn get_profile(&self, token: &str) -> Result<Profile>;

    /// Post a multipart batch body and return the raw answer, whatever its status
    async fn post_batch(&self, token: &str, boundary: &str, body: String) -> Result<BatchResponse>;
}

/// reqwest-backed Gmail client
#[derive(Clone, Debug)]
pub struct GmailClient {
    http_client: reqwest::Client,
    api_base: String,
    batch_url: String,
}

impl GmailClient {
    /// Create a client for the configured endpoints
    ///
    /// # Errors
    /// Returns an error if an endpoint is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn new(config: &GmailConfig) -> Result<Self> {
        for (key, value) in [
            ("gmail.api_base", &config.api_base),
            ("gmail.batch_url", &config.batch_url),
        ] {
            url::Url::parse(value).map_err(|e| Error::Config {
                message: format!("invalid endpoint URL {value}: {e}"),
                key: Some(key.to_string()),
            })?;
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("mailbox-carbon/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            batch_url: config.batch_url.clone(),
        })
    }

    fn user_url(&self, path: &str) -> String {
        format!("{}/users/me/{}", self.api_base, path)
    }
}

#[async_trait]
impl MailApi for GmailClient {
    async fn list_messages(
        &self,
        token: &str,
        page_size: usize,
        page_token: Option<&str>,
    ) -> Result<MessageListPage> {
        let mut request = self
            .http_client
            .get(self.user_url("messages"))
            .bearer_auth(token)
            .query(&[("maxResults", page_size.to_string())]);
        if let Some(cursor) = page_token {
            request = request.query(&[("pageToken", cursor)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
            });
        }

        Ok(response.json::<MessageListPage>().await?)
    }

    async fn get_profile(&self, token: &str) -> Result<Profile> {
        let response = self
            .http_client
            .get(self.user_url("profile"))
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
            });
        }

        Ok(response.json::<Profile>().await?)
    }

    async fn post_batch(&self, token: &str, boundary: &str, body: String) -> Result<BatchResponse> {
        let response = self
            .http_client
            .post(&self.batch_url)
            .bearer_auth(token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/mixed; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await?;

        let status = response.status();
        // Throttled answers carry no useful body
        let body = if status == StatusCode::TOO_MANY_REQUESTS {
            String::new()
        } else {
            response.text().await?
        };

        Ok(BatchResponse::new(status.as_u16(), body))
    }
}

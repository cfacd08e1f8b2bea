//! Cursor-paged message listing

use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::retry::Sleeper;
use crate::types::MessageRef;

use super::MailApi;

/// Walks the list endpoint page by page
///
/// Pages are fetched strictly in cursor order. A non-success status aborts
/// the walk immediately; unlike the batch executor, HTTP 429 is not retried
/// here.
pub struct MessageLister {
    api: Arc<dyn MailApi>,
    sleeper: Arc<dyn Sleeper>,
    config: PipelineConfig,
}

impl MessageLister {
    /// Create a lister using `config.page_size` and `config.page_delay`
    pub fn new(api: Arc<dyn MailApi>, sleeper: Arc<dyn Sleeper>, config: PipelineConfig) -> Self {
        Self {
            api,
            sleeper,
            config,
        }
    }

    /// List message refs, at most `max_results` of them (None = all)
    ///
    /// # Errors
    /// Returns [`Error::Api`](crate::Error::Api) with the status of the first
    /// failing page, or a transport error.
    pub async fn list_all(&self, token: &str, max_results: Option<usize>) -> Result<Vec<MessageRef>> {
        let mut messages: Vec<MessageRef> = Vec::new();
        let mut page_token: Option<String> = None;
        let mut page_count = 0usize;

        if max_results == Some(0) {
            return Ok(messages);
        }

        loop {
            let remaining = match max_results {
                Some(cap) => cap.saturating_sub(messages.len()),
                None => self.config.page_size,
            };
            let page_size = self.config.page_size.min(remaining);

            page_count += 1;
            let page = self
                .api
                .list_messages(token, page_size, page_token.as_deref())
                .await
                .inspect_err(|e| {
                    tracing::error!(page = page_count, error = %e, "Error retrieving messages")
                })?;

            messages.extend(page.messages);
            page_token = page.next_page_token;

            tracing::debug!(
                page = page_count,
                fetched = messages.len(),
                has_next = page_token.is_some(),
                "message list page"
            );

            let reached_cap = max_results.is_some_and(|cap| messages.len() >= cap);
            if reached_cap || page_token.is_none() {
                break;
            }

            self.sleeper.sleep(self.config.page_delay).await;
        }

        if let Some(cap) = max_results {
            messages.truncate(cap);
        }

        tracing::info!(
            messages = messages.len(),
            pages = page_count,
            "Listed mailbox messages"
        );
        Ok(messages)
    }
}

//! Common test utilities for mailbox-carbon integration tests
//!
//! A wiremock server standing in for the Gmail list, profile and batch
//! endpoints.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use mailbox_carbon::Config;
use mailbox_carbon::config::{GmailConfig, PipelineConfig, RateLimitConfig};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Config pointing at `server`, with pacing shortened for tests
pub fn config_for(server: &MockServer, database_path: std::path::PathBuf) -> Config {
    let mut config = Config::default();
    config.gmail = GmailConfig {
        api_base: format!("{}/gmail/v1", server.uri()),
        batch_url: format!("{}/batch/gmail/v1", server.uri()),
        ..Default::default()
    };
    config.pipeline = PipelineConfig {
        page_delay: Duration::from_millis(1),
        group_delay_high: Duration::from_millis(1),
        group_delay_low: Duration::from_millis(1),
        ..Default::default()
    };
    config.retry = RateLimitConfig {
        retry_delay: Duration::from_millis(5),
        max_retries: 3,
    };
    config.persistence.database_path = database_path;
    config
}

/// Mount the profile endpoint reporting `total` messages
pub async fn mount_profile(server: &MockServer, total: u64) {
    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "emailAddress": "someone@example.com",
            "messagesTotal": total,
            "threadsTotal": total,
            "historyId": "1"
        })))
        .mount(server)
        .await;
}

/// Mount list pages; page `n` is served for cursor `"p{n}"` (first page without cursor)
pub async fn mount_list_pages(server: &MockServer, pages: &[std::ops::Range<usize>]) {
    for (index, range) in pages.iter().enumerate() {
        let messages: Vec<_> = range
            .clone()
            .map(|i| serde_json::json!({"id": format!("m{i}"), "threadId": format!("t{i}")}))
            .collect();
        let mut body = serde_json::json!({
            "messages": messages,
            "resultSizeEstimate": messages.len(),
        });
        if index + 1 < pages.len() {
            body["nextPageToken"] = serde_json::json!(format!("p{}", index + 1));
        }

        let mock = Mock::given(method("GET")).and(path("/gmail/v1/users/me/messages"));
        let mock = if index == 0 {
            mock.and(query_param_is_missing("pageToken"))
        } else {
            mock.and(query_param("pageToken", format!("p{index}")))
        };
        mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }
}

/// Batch endpoint answering every sub-request from the request body
///
/// The first `throttle_first` calls get HTTP 429. Ids listed in `large`
/// report 250 kB, every other id 2 kB.
pub struct BatchResponder {
    pub calls: Arc<AtomicUsize>,
    pub throttle_first: usize,
    pub large: Vec<String>,
}

impl Respond for BatchResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.throttle_first {
            return ResponseTemplate::new(429);
        }

        let body = String::from_utf8_lossy(&request.body);
        let ids: Vec<&str> = body
            .lines()
            .filter_map(|line| line.strip_prefix("GET /gmail/v1/users/me/messages/"))
            .filter_map(|rest| rest.split('?').next())
            .collect();

        let mut response = String::new();
        for (index, id) in ids.iter().enumerate() {
            let size = if self.large.iter().any(|l| l == id) {
                250_000
            } else {
                2_000
            };
            response.push_str(&format!(
                "--batch_xyz\r\nContent-Type: application/http\r\nContent-ID: <response-item{index}>\r\n\r\n\
                 HTTP/1.1 200 OK\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n\
                 {{\"id\": \"{id}\", \"threadId\": \"t\", \"sizeEstimate\": {size}}}\r\n"
            ));
        }
        response.push_str("--batch_xyz--");

        ResponseTemplate::new(200)
            .insert_header("content-type", "multipart/mixed; boundary=batch_xyz")
            .set_body_string(response)
    }
}

/// Mount the batch endpoint and return its call counter
pub async fn mount_batch(
    server: &MockServer,
    throttle_first: usize,
    large: &[&str],
) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    Mock::given(method("POST"))
        .and(path("/batch/gmail/v1"))
        .respond_with(BatchResponder {
            calls: calls.clone(),
            throttle_first,
            large: large.iter().map(|s| s.to_string()).collect(),
        })
        .mount(server)
        .await;
    calls
}

//! Scripted in-memory Gmail provider for pipeline tests.

use super::{BatchResponse, MailApi};
use crate::error::{Error, Result};
use crate::types::{MessageListPage, MessageRef, Profile};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Size returned for ids without an explicit size.
pub(crate) const DEFAULT_MESSAGE_SIZE: u64 = 1_000;

/// One recorded list request.
#[derive(Clone, Debug)]
pub(crate) struct ListCall {
    pub page_size: usize,
    pub page_token: Option<String>,
}

/// One recorded batch request.
#[derive(Clone, Debug)]
pub(crate) struct BatchCall {
    pub token: String,
    pub boundary: String,
    pub body: String,
}

impl BatchCall {
    /// Message ids the batch asked for, in request order.
    pub fn ids(&self) -> Vec<String> {
        requested_ids(&self.body)
    }
}

#[derive(Default)]
struct State {
    mailbox: Vec<String>,
    ignore_page_size: bool,
    list_failures: HashMap<usize, u16>,
    list_calls: Vec<ListCall>,
    profile_total: Option<u64>,
    profile_failure: Option<u16>,
    profile_calls: usize,
    batch_queue: VecDeque<BatchResponse>,
    batch_calls: Vec<BatchCall>,
    sizes: HashMap<String, u64>,
    failing_ids: HashMap<String, u16>,
    in_flight: usize,
    max_in_flight: usize,
}

/// In-memory provider.
///
/// Lists `m0..m{n}` with the end offset of each page as its cursor. Batch
/// answers are taken from the scripted queue first; once it is empty they
/// are generated from the ids in the request body.
pub(crate) struct ScriptedMailApi {
    state: Mutex<State>,
}

impl ScriptedMailApi {
    pub fn new() -> Self {
        Self::with_mailbox(0)
    }

    pub fn with_mailbox(size: usize) -> Self {
        let state = State {
            mailbox: (0..size).map(|i| format!("m{i}")).collect(),
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    /// Return full 500-id pages whatever page size was requested.
    pub fn ignore_page_size(&self) {
        self.state.lock().unwrap().ignore_page_size = true;
    }

    /// Make the `call_index`-th list request (0-based) fail with `status`.
    pub fn fail_list_page(&self, call_index: usize, status: u16) {
        self.state
            .lock()
            .unwrap()
            .list_failures
            .insert(call_index, status);
    }

    pub fn set_profile_total(&self, total: u64) {
        self.state.lock().unwrap().profile_total = Some(total);
    }

    pub fn fail_profile(&self, status: u16) {
        self.state.lock().unwrap().profile_failure = Some(status);
    }

    /// Queue a literal answer for the next batch request.
    pub fn push_batch(&self, response: BatchResponse) {
        self.state.lock().unwrap().batch_queue.push_back(response);
    }

    pub fn set_message_size(&self, id: &str, size: u64) {
        self.state
            .lock()
            .unwrap()
            .sizes
            .insert(id.to_string(), size);
    }

    /// Any generated batch containing `id` answers `status`.
    pub fn fail_batch_containing(&self, id: &str, status: u16) {
        self.state
            .lock()
            .unwrap()
            .failing_ids
            .insert(id.to_string(), status);
    }

    pub fn list_calls(&self) -> Vec<ListCall> {
        self.state.lock().unwrap().list_calls.clone()
    }

    pub fn batch_calls(&self) -> Vec<BatchCall> {
        self.state.lock().unwrap().batch_calls.clone()
    }

    pub fn profile_calls(&self) -> usize {
        self.state.lock().unwrap().profile_calls
    }

    /// Highest number of batch requests observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }

    fn generated_batch(&self, body: &str) -> BatchResponse {
        let state = self.state.lock().unwrap();
        let ids = requested_ids(body);

        if let Some(status) = ids.iter().find_map(|id| state.failing_ids.get(id)) {
            return BatchResponse::new(*status, "scripted failure");
        }

        let items: Vec<(&str, u64)> = ids
            .iter()
            .map(|id| {
                let size = state.sizes.get(id).copied().unwrap_or(DEFAULT_MESSAGE_SIZE);
                (id.as_str(), size)
            })
            .collect();
        BatchResponse::new(200, multipart_response(&items))
    }
}

#[async_trait]
impl MailApi for ScriptedMailApi {
    async fn list_messages(
        &self,
        _token: &str,
        page_size: usize,
        page_token: Option<&str>,
    ) -> Result<MessageListPage> {
        let mut state = self.state.lock().unwrap();
        let call_index = state.list_calls.len();
        state.list_calls.push(ListCall {
            page_size,
            page_token: page_token.map(str::to_string),
        });

        if let Some(status) = state.list_failures.get(&call_index) {
            return Err(Error::Api { status: *status });
        }

        let offset: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
        let take = if state.ignore_page_size { 500 } else { page_size };
        let end = (offset + take).min(state.mailbox.len());

        let messages = state.mailbox[offset..end]
            .iter()
            .map(|id| MessageRef {
                id: id.clone(),
                thread_id: None,
            })
            .collect();
        let next_page_token = (end < state.mailbox.len()).then(|| end.to_string());

        Ok(MessageListPage {
            messages,
            next_page_token,
            result_size_estimate: None,
        })
    }

    async fn get_profile(&self, _token: &str) -> Result<Profile> {
        let mut state = self.state.lock().unwrap();
        state.profile_calls += 1;

        if let Some(status) = state.profile_failure {
            return Err(Error::Api { status });
        }

        Ok(Profile {
            email_address: "someone@example.com".to_string(),
            messages_total: state
                .profile_total
                .unwrap_or(state.mailbox.len() as u64),
            ..Default::default()
        })
    }

    async fn post_batch(&self, token: &str, boundary: &str, body: String) -> Result<BatchResponse> {
        let scripted = {
            let mut state = self.state.lock().unwrap();
            state.batch_calls.push(BatchCall {
                token: token.to_string(),
                boundary: boundary.to_string(),
                body: body.clone(),
            });
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.batch_queue.pop_front()
        };

        // Give sibling batches of the same cohort a chance to start
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }

        let response = scripted.unwrap_or_else(|| self.generated_batch(&body));
        self.state.lock().unwrap().in_flight -= 1;
        Ok(response)
    }
}

/// Build a successful multipart batch answer for `(id, sizeEstimate)` pairs.
pub(crate) fn multipart_response(items: &[(&str, u64)]) -> String {
    let mut body = String::new();
    for (index, (id, size)) in items.iter().enumerate() {
        body.push_str("--batch_resp\r\n");
        body.push_str("Content-Type: application/http\r\n");
        body.push_str(&format!("Content-ID: <response-item{index}>\r\n\r\n"));
        body.push_str("HTTP/1.1 200 OK\r\n");
        body.push_str("Content-Type: application/json; charset=UTF-8\r\n\r\n");
        body.push_str(&format!(
            "{{\"id\": \"{id}\", \"threadId\": \"t-{id}\", \"sizeEstimate\": {size}}}\r\n"
        ));
    }
    body.push_str("--batch_resp--");
    body
}

fn requested_ids(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("GET "))
        .filter_map(|path| path.split("/messages/").nth(1))
        .filter_map(|rest| rest.split('?').next())
        .map(str::to_string)
        .collect()
}

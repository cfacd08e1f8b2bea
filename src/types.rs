//! Core types and events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identifier of one message, as returned by the list endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    /// Opaque message id
    pub id: String,
    /// Thread the message belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// Size information for one message, decoded from a batch response fragment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDetail {
    /// Message id (never empty when produced by the decoder)
    pub id: String,
    /// Size in bytes; `None` marks an entry the aggregator must skip
    #[serde(default)]
    pub size_estimate: Option<u64>,
}

impl MessageDetail {
    /// Create a detail with a known size
    pub fn new(id: impl Into<String>, size_estimate: u64) -> Self {
        Self {
            id: id.into(),
            size_estimate: Some(size_estimate),
        }
    }
}

/// One page of the message list endpoint
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageListPage {
    /// Messages on this page (absent on an empty mailbox)
    #[serde(default)]
    pub messages: Vec<MessageRef>,
    /// Cursor for the next page; absent on the last page
    #[serde(default)]
    pub next_page_token: Option<String>,
    /// Provider's estimate of the total result count
    #[serde(default)]
    pub result_size_estimate: Option<u32>,
}

/// Mailbox profile
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Address of the authenticated account
    #[serde(default)]
    pub email_address: String,
    /// Number of messages in the mailbox
    #[serde(default)]
    pub messages_total: u64,
    /// Number of threads in the mailbox
    #[serde(default)]
    pub threads_total: u64,
    /// Current history id
    #[serde(default)]
    pub history_id: String,
}

/// Progress of the detail retrieval phase
///
/// `processed` counts successfully decoded details, not ids submitted, so
/// the percentage under-reports when fragments are dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Progress {
    /// Details decoded so far
    pub processed: usize,
    /// Ids to process in this run
    pub total: usize,
    /// `processed / total` as a rounded percentage
    pub percentage: u32,
}

impl Progress {
    /// Build a progress snapshot
    pub fn new(processed: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            0
        } else {
            (processed as f64 / total as f64 * 100.0).round() as u32
        };
        Self {
            processed,
            total,
            percentage,
        }
    }
}

/// Terminal aggregate of one analysis run
///
/// Serialized with the exact keys the popup and widget read from storage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Mailbox message count from the profile endpoint, if known
    pub total_emails_in_mailbox: Option<u64>,
    /// Ids returned by the lister
    pub total_emails: usize,
    /// Details successfully retrieved
    pub analyzed_emails: usize,
    /// Details without a usable size
    pub skipped_emails: usize,
    /// Share of the mailbox analyzed, one decimal (or "100" when unknown)
    pub analyzed_percentage: String,
    /// Total emissions in grams
    #[serde(rename = "totalCO2Grams")]
    pub total_co2_grams: u64,
    /// Total emissions in kilograms, two decimals
    #[serde(rename = "totalCO2Kg")]
    pub total_co2_kg: String,
    /// Messages above the attachment threshold
    pub emails_with_attachments: usize,
    /// Messages at or below the attachment threshold
    pub emails_simple: usize,
    /// Mean grams per analyzed message, two decimals (or "0")
    #[serde(rename = "averageCO2PerEmail")]
    pub average_co2_per_email: String,
    /// When the run finished
    pub analyzed_date: DateTime<Utc>,
    /// Car-kilometre equivalent at 200 g/km
    pub car_equivalent_km: u64,
}

/// Event emitted during an analysis run
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A run has started
    Started,

    /// The lister finished
    Listed {
        /// Ids that will be analyzed
        total: usize,
    },

    /// A cohort of batches finished
    Progress {
        /// Details decoded so far
        processed: usize,
        /// Ids to process in this run
        total: usize,
        /// Rounded percentage
        percentage: u32,
    },

    /// The run finished and its result was stored
    Complete {
        /// The stored result
        result: AnalysisResult,
    },

    /// The run failed
    Failed {
        /// Error message shown to the user
        error: String,
    },
}

impl From<Progress> for Event {
    fn from(progress: Progress) -> Self {
        Event::Progress {
            processed: progress.processed,
            total: progress.total,
            percentage: progress.percentage,
        }
    }
}

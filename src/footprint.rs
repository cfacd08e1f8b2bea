//! Size-to-CO2 model and result aggregation
//!
//! The model is a two-bucket step function: a message above
//! [`ATTACHMENT_SIZE_THRESHOLD`] bytes is assumed to carry an attachment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::{AnalysisResult, MessageDetail};

/// Grams of CO2 for a message without attachment
pub const CO2_PER_EMAIL_SIMPLE: u64 = 4;

/// Grams of CO2 for a message with attachment
pub const CO2_PER_EMAIL_WITH_ATTACHMENT: u64 = 35;

/// Size in bytes above which a message counts as having an attachment
pub const ATTACHMENT_SIZE_THRESHOLD: u64 = 100_000;

/// Grams of CO2 per car kilometre used for `carEquivalentKm`
pub const CO2_GRAMS_PER_CAR_KM: f64 = 200.0;

/// Kilograms of CO2 per car kilometre used by [`Comparisons`]
pub const CO2_KG_PER_CAR_KM: f64 = 0.21;

/// Kilograms of CO2 per meal used by [`Comparisons`]
pub const CO2_KG_PER_MEAL: f64 = 2.0;

/// Emissions in grams for one message of `size` bytes
pub fn co2_for_size(size: u64) -> u64 {
    if size > ATTACHMENT_SIZE_THRESHOLD {
        CO2_PER_EMAIL_WITH_ATTACHMENT
    } else {
        CO2_PER_EMAIL_SIMPLE
    }
}

/// Totals over a set of message details
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Sum of per-message emissions in grams
    pub total_co2_grams: u64,
    /// Messages above the threshold
    pub emails_with_attachments: usize,
    /// Messages at or below the threshold
    pub emails_simple: usize,
    /// Details without a size
    pub skipped: usize,
}

impl Statistics {
    /// Fold details into totals; details without a size are counted as skipped
    pub fn from_details(details: &[MessageDetail]) -> Self {
        details
            .iter()
            .fold(Self::default(), |mut stats, detail| {
                match detail.size_estimate {
                    Some(size) => {
                        stats.total_co2_grams += co2_for_size(size);
                        if size > ATTACHMENT_SIZE_THRESHOLD {
                            stats.emails_with_attachments += 1;
                        } else {
                            stats.emails_simple += 1;
                        }
                    }
                    None => stats.skipped += 1,
                }
                stats
            })
    }
}

/// Build the result of a run
///
/// # Arguments
/// * `details` - Everything the orchestrator retrieved
/// * `total_listed` - Ids the lister returned
/// * `mailbox_total` - Message count from the profile, if known
/// * `analyzed_date` - Completion timestamp
pub fn summarize(
    details: &[MessageDetail],
    total_listed: usize,
    mailbox_total: Option<u64>,
    analyzed_date: DateTime<Utc>,
) -> AnalysisResult {
    let stats = Statistics::from_details(details);
    let total = stats.total_co2_grams as f64;
    let analyzed = details.len();

    let analyzed_percentage = match mailbox_total {
        Some(mailbox) if mailbox > 0 => fixed(analyzed as f64 / mailbox as f64 * 100.0, 1),
        _ => "100".to_string(),
    };
    let average_co2_per_email = if analyzed > 0 {
        fixed(total / analyzed as f64, 2)
    } else {
        "0".to_string()
    };

    AnalysisResult {
        total_emails_in_mailbox: mailbox_total,
        total_emails: total_listed,
        analyzed_emails: analyzed,
        skipped_emails: stats.skipped,
        analyzed_percentage,
        total_co2_grams: stats.total_co2_grams,
        total_co2_kg: fixed(total / 1000.0, 2),
        emails_with_attachments: stats.emails_with_attachments,
        emails_simple: stats.emails_simple,
        average_co2_per_email,
        analyzed_date,
        car_equivalent_km: (total / CO2_GRAMS_PER_CAR_KM).round() as u64,
    }
}

/// Format `value` with exactly `decimals` digits, halves rounded away from zero
pub fn fixed(value: f64, decimals: usize) -> String {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    format!("{rounded:.decimals$}")
}

/// Everyday equivalents shown next to a result
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Comparisons {
    /// Kilometres driven by car, one decimal
    pub car_km: String,
    /// Meals, one decimal
    pub meals: String,
}

impl Comparisons {
    /// Derive comparisons from the stored kilogram figure
    pub fn from_result(result: &AnalysisResult) -> Self {
        let kg = result
            .total_co2_kg
            .parse::<f64>()
            .unwrap_or(result.total_co2_grams as f64 / 1000.0);

        Self {
            car_km: fixed(kg / CO2_KG_PER_CAR_KM, 1),
            meals: fixed(kg / CO2_KG_PER_MEAL, 1),
        }
    }
}

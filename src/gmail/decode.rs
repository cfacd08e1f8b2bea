//! Multipart batch response decoding
//!
//! Gmail answers a batch request with one `multipart/mixed` body. Each part is
//! tagged `Content-ID: <response-item<N>>` and wraps an HTTP-style response
//! whose payload is the message JSON, or an error status line when that
//! sub-request failed.

use crate::types::MessageDetail;
use regex::Regex;
use std::sync::OnceLock;

/// Status line a throttled sub-request carries inside its part
const RATE_LIMITED_MARKER: &str = "429 Too Many Requests";

#[allow(clippy::expect_used)]
fn part_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"Content-ID: <response-item\d+>").expect("response tag pattern is valid")
    })
}

#[allow(clippy::expect_used)]
fn size_object() -> &'static Regex {
    static OBJECT: OnceLock<Regex> = OnceLock::new();
    OBJECT.get_or_init(|| {
        Regex::new(r#"(?s)\{.*?"sizeEstimate".*?\}"#).expect("size object pattern is valid")
    })
}

/// Decode every valid message detail from a raw batch response body
///
/// Parts are located by their response tag; the preamble before the first tag
/// is ignored. A part that was throttled, or whose payload is not a JSON
/// object with a non-empty `id` and a non-negative whole-number `sizeEstimate`,
/// contributes nothing. Output order is not tied to request order.
pub fn parse_batch_response(response_text: &str) -> Vec<MessageDetail> {
    let (marker, object) = (part_marker(), size_object());

    let mut results = Vec::new();
    let mut throttled = 0usize;
    let mut malformed = 0usize;

    for part in marker.split(response_text).skip(1) {
        if part.contains(RATE_LIMITED_MARKER) {
            throttled += 1;
            continue;
        }

        match object.find(part).and_then(|m| parse_detail(m.as_str())) {
            Some(detail) => results.push(detail),
            None => malformed += 1,
        }
    }

    if throttled > 0 || malformed > 0 {
        tracing::debug!(
            decoded = results.len(),
            throttled,
            malformed,
            "dropped batch fragments"
        );
    }

    results
}

fn parse_detail(candidate: &str) -> Option<MessageDetail> {
    let value: serde_json::Value = serde_json::from_str(candidate).ok()?;

    let id = value.get("id")?.as_str()?;
    if id.is_empty() {
        return None;
    }
    let size = size_value(value.get("sizeEstimate")?)?;

    Some(MessageDetail::new(id, size))
}

// Whole numbers written in float form (`1.5e5`) count as sizes
fn size_value(value: &serde_json::Value) -> Option<u64> {
    if let Some(size) = value.as_u64() {
        return Some(size);
    }
    let size = value.as_f64()?;
    (size.is_finite() && size >= 0.0 && size.fract() == 0.0 && size <= u64::MAX as f64)
        .then_some(size as u64)
}

//! Best-effort recovery of JSON records from stream payloads.
//!
//! Payloads may carry non-JSON framing ahead of the record, for example a
//! schema-registry magic byte and schema id. Two strategies are tried:
//!
//! 1. Parse everything from the first `{` to the end of the payload.
//! 2. Within the first [`FALLBACK_SCAN_LIMIT`] bytes, parse the span from the
//!    first `{` to the first `}` after it.
//!
//! The second strategy does not understand nested objects: a record whose
//! first object contains another object is cut at the inner `}` and will not
//! parse.

use crate::event::EventContext;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Number of leading bytes searched by the fallback strategy.
pub const FALLBACK_SCAN_LIMIT: usize = 1000;

/// Failure to recover any record from a payload.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("no parseable payload")]
    NoParseablePayload,
}

/// Decodes an enriched event context from a raw payload.
pub fn decode(raw: &[u8]) -> Result<EventContext, DecodeError> {
    decode_as(raw)
}

/// Decodes any JSON record from a raw payload.
pub fn decode_as<T: DeserializeOwned>(raw: &[u8]) -> Result<T, DecodeError> {
    if let Some(start) = raw.iter().position(|b| *b == b'{') {
        let text = String::from_utf8_lossy(&raw[start..]);
        match serde_json::from_str::<T>(&text) {
            Ok(record) => return Ok(record),
            Err(e) => debug!("strict decode failed at offset {}: {}", start, e),
        }
    }

    let limit = raw.len().min(FALLBACK_SCAN_LIMIT);
    let text = String::from_utf8_lossy(&raw[..limit]);
    let span = first_brace_span(&text).ok_or(DecodeError::NoParseablePayload)?;

    serde_json::from_str::<T>(span).map_err(|e| {
        debug!("fallback decode failed: {}", e);
        DecodeError::NoParseablePayload
    })
}

/// Returns the shortest `{ ... }` span starting at the first `{`.
fn first_brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = start + text[start..].find('}')?;
    Some(&text[start..=end])
}

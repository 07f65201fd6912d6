#![forbid(unsafe_code)]

//! Persisted-history records and request folding.
//!
//! A committed request is persisted as a [`RequestRecord`]: its registry
//! kind plus two opaque strings, the encoded construction arguments and
//! the encoded interactive message log. The engine never interprets the
//! two strings; the registry's codec for that kind produced them and will
//! parse them back. The standard codec here is plain JSON.
//!
//! Replaying a record reconstructs the request through the registry,
//! re-delivers the recorded messages on their original channels, and
//! commits. Given the same starting document state, that reproduces the
//! original mutation.

use serde::{Deserialize, Serialize};

use crate::composite::CompositeRequest;
use crate::error::TxnError;
use crate::request::{Message, Request};

/// One committed request in a persisted history, oldest-first in the
/// containing list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    /// Registry kind, written as `type` on the wire.
    #[serde(rename = "type")]
    pub kind: String,
    /// Encoded construction arguments.
    pub args: String,
    /// Encoded message log.
    pub msgs: String,
}

/// Encode a message log with the standard JSON codec.
pub fn encode_messages(messages: &[Message]) -> Result<String, TxnError> {
    Ok(serde_json::to_string(messages)?)
}

/// Decode a message log written by [`encode_messages`].
pub fn decode_messages(encoded: &str) -> Result<Vec<Message>, TxnError> {
    Ok(serde_json::from_str(encoded)?)
}

/// Fold a list of committed requests (oldest first) into a single
/// request.
///
/// Consecutive requests are merged pairwise via `compose` where the
/// earlier one accepts; whatever survives is wrapped in a committed
/// [`CompositeRequest`] unless exactly one request remains, which is
/// returned as-is. `None` for an empty input.
pub fn compose_requests(requests: Vec<Box<dyn Request>>) -> Option<Box<dyn Request>> {
    let mut survivors: Vec<Box<dyn Request>> = Vec::new();
    for mut request in requests {
        if let Some(prev) = survivors.last_mut() {
            if prev.compose(request.as_mut()) {
                continue;
            }
        }
        survivors.push(request);
    }
    match survivors.len() {
        0 => None,
        1 => survivors.pop(),
        _ => Some(Box::new(CompositeRequest::from_committed(survivors))),
    }
}

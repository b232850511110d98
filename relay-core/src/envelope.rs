//! The uniform JSON envelope returned by every relay endpoint.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Response envelope: `{status, data | message, timestamp}`.
///
/// A success envelope carries `data` and no `message`; a failure envelope
/// carries `message` and no `data`. The timestamp is taken at construction.
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct Envelope<T> {
    /// `true` for success responses, `false` for failures.
    pub status: bool,

    /// Reshaped payload, present only when `status` is `true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    /// Human-readable failure description, present only when `status` is `false`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// RFC 3339 UTC timestamp of envelope construction.
    pub timestamp: DateTime<Utc>,
}

impl<T: Serialize> Envelope<T> {
    /// Wrap a payload in a success envelope.
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            status: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now(),
        }
    }
}

impl Envelope<()> {
    /// Build a failure envelope carrying only a message.
    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: false,
            data: None,
            message: Some(message.into()),
            timestamp: Utc::now(),
        }
    }
}

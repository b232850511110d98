//! Error types for the outbound engine.

use std::time::Duration;

/// Errors that can occur while talking to upstream services.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum UpstreamError {
    /// Transport-level failure: connect error, timeout, TLS, etc.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The upstream answered with a non-success status code.
    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body exceeded the configured cap and was discarded.
    #[error("response body exceeds the {limit}-byte cap")]
    BodyTooLarge { limit: usize },

    /// The response body could not be decoded into the expected shape.
    #[error("failed to decode upstream response: {0}")]
    Decode(String),

    /// A caller-supplied input was unusable before any upstream call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Every file host in the fallback chain failed.
    #[error("all file hosts failed: {}", .failures.join("; "))]
    AllHostsFailed { failures: Vec<String> },

    /// The failure breaker is open; the upstream was not called.
    #[error("breaker open: too many consecutive failures, retry in {}s", .retry_after.as_secs().max(1))]
    BreakerOpen { retry_after: Duration },

    /// A submitted job did not reach a terminal state within the poll budget.
    #[error("upstream job did not finish after {polls} status polls")]
    PollTimeout { polls: u32 },

    /// A submitted job reported failure.
    #[error("upstream job failed: {reason}")]
    JobFailed { reason: String },

    /// A scrape target was missing an element the extraction relies on.
    #[error("expected element not found in page: {what}")]
    MissingElement { what: String },
}
